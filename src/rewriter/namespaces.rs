//! First pass over a model document
//!
//! Checks that the document is well-formed and has the minimum
//! `model`/`resources`/`build` shape, records the namespace of the root
//! element, and collects the prefixes that are still referenced once the
//! stripped attributes are gone. Declarations of any other prefix are dropped
//! by the second pass.

use super::RewriteRules;
use crate::error::{Error, Result};
use crate::parser::{location, unclosed_element, xml_error};
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use std::collections::HashSet;

/// Attributes whose values list extension namespaces by prefix
const PREFIX_LIST_ATTRIBUTES: [&[u8]; 2] = [b"requiredextensions", b"recommendedextensions"];

/// Namespace an element or attribute name resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolved<'a> {
    /// No namespace (unprefixed attribute, or element without a default namespace)
    None,
    /// Bound to this URI
    Uri(&'a [u8]),
    /// Prefix without a declaration in scope
    UnknownPrefix,
}

impl<'a> Resolved<'a> {
    pub(crate) fn of(result: &ResolveResult<'a>) -> Self {
        match result {
            ResolveResult::Bound(ns) => Resolved::Uri(ns.0),
            ResolveResult::Unbound => Resolved::None,
            ResolveResult::Unknown(_) => Resolved::UnknownPrefix,
        }
    }
}

/// What the first pass learned about a document
#[derive(Debug, Default)]
pub(crate) struct DocumentScan {
    /// Namespace URI of the root element, `None` when it has none
    pub source_namespace: Option<String>,
    /// Prefixes referenced by emitted names or by extension lists
    pub used_prefixes: HashSet<String>,
}

impl DocumentScan {
    /// Whether an element in `namespace` belongs to the model vocabulary
    ///
    /// Such elements are emitted unprefixed in the target namespace.
    pub fn is_model_namespace(&self, namespace: Resolved<'_>, rules: &RewriteRules) -> bool {
        match namespace {
            Resolved::UnknownPrefix => false,
            Resolved::None => self.source_namespace.is_none(),
            Resolved::Uri(uri) => {
                uri == rules.model_namespace().as_bytes()
                    || self.source_namespace.as_deref().map(str::as_bytes) == Some(uri)
            }
        }
    }

    pub fn is_used(&self, prefix: &[u8]) -> bool {
        std::str::from_utf8(prefix)
            .map(|p| self.used_prefixes.contains(p))
            .unwrap_or(false)
    }
}

pub(crate) fn utf8<'b>(bytes: &'b [u8], text: &str, position: u64) -> Result<&'b str> {
    std::str::from_utf8(bytes).map_err(|err| Error::parse(err.to_string(), location(text, position)))
}

/// Run the first pass over decoded document text
pub(crate) fn scan(text: &str, rules: &RewriteRules) -> Result<DocumentScan> {
    let mut reader = NsReader::from_str(text);
    let mut scan = DocumentScan::default();

    let mut open: Vec<String> = Vec::new();
    let mut seen_root = false;
    let mut has_resources = false;
    let mut has_build = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml_error(text, reader.error_position(), &e))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let position = reader.buffer_position();
                let (ns, local) = reader.resolver().resolve_element(e.name());
                let local = utf8(local.as_ref(), text, position)?.to_string();
                if let ResolveResult::Unknown(prefix) = &ns {
                    return Err(undeclared_prefix(prefix, text, position));
                }

                if open.is_empty() {
                    if seen_root {
                        return Err(Error::parse(
                            "Document has more than one root element",
                            location(text, position),
                        ));
                    }
                    seen_root = true;
                    if local != "model" {
                        return Err(Error::structure(format!(
                            "Root element is <{}>, expected <model>",
                            local
                        )));
                    }
                    if let ResolveResult::Bound(uri) = &ns {
                        scan.source_namespace = Some(String::from_utf8_lossy(uri.0).into_owned());
                    }
                    collect_extension_prefixes(e, text, position, &mut scan)?;
                } else if open.len() == 1 {
                    has_resources |= local == "resources";
                    has_build |= local == "build";
                }

                if !scan.is_model_namespace(Resolved::of(&ns), rules) {
                    if let Some(prefix) = e.name().prefix() {
                        let prefix = utf8(prefix.as_ref(), text, position)?;
                        scan.used_prefixes.insert(prefix.to_string());
                    }
                }

                let is_root = open.is_empty();
                for attr in e.attributes() {
                    let attr = attr.map_err(|err| {
                        Error::parse(
                            format!("Attribute parsing failed: {}", err),
                            location(text, position),
                        )
                    })?;
                    let key = attr.key.as_ref();
                    if key == b"xmlns" || key.starts_with(b"xmlns:") {
                        continue;
                    }
                    let (attr_ns, attr_local) = reader.resolver().resolve_attribute(attr.key);
                    if let ResolveResult::Unknown(prefix) = &attr_ns {
                        return Err(undeclared_prefix(prefix, text, position));
                    }
                    if rules.is_stripped(Resolved::of(&attr_ns), attr_local.as_ref(), is_root) {
                        continue;
                    }
                    if let Some(prefix) = attr.key.prefix() {
                        let prefix = utf8(prefix.as_ref(), text, position)?;
                        if prefix != "xml" {
                            scan.used_prefixes.insert(prefix.to_string());
                        }
                    }
                }

                if matches!(event, Event::Start(_)) {
                    open.push(local);
                }
            }
            Event::End(_) => {
                open.pop();
            }
            Event::Text(ref t) if open.is_empty() => {
                if !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(content_outside_root(text, reader.buffer_position()));
                }
            }
            Event::CData(_) | Event::GeneralRef(_) if open.is_empty() => {
                return Err(content_outside_root(text, reader.buffer_position()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(element) = open.last() {
        return Err(unclosed_element(text, element));
    }
    if !seen_root {
        return Err(Error::structure("Document has no root <model> element"));
    }
    if !has_resources {
        return Err(Error::structure("Document has no <resources> element"));
    }
    if !has_build {
        return Err(Error::structure("Document has no <build> element"));
    }

    Ok(scan)
}

fn undeclared_prefix(prefix: &[u8], text: &str, position: u64) -> Error {
    Error::parse(
        format!(
            "Namespace prefix '{}' is not declared",
            String::from_utf8_lossy(prefix)
        ),
        location(text, position),
    )
}

fn content_outside_root(text: &str, position: u64) -> Error {
    Error::parse(
        "Character data outside the root element",
        location(text, position),
    )
}

fn collect_extension_prefixes(
    root: &BytesStart,
    text: &str,
    position: u64,
    scan: &mut DocumentScan,
) -> Result<()> {
    for attr in root.attributes().flatten() {
        if !PREFIX_LIST_ATTRIBUTES.contains(&attr.key.as_ref()) {
            continue;
        }
        let value = utf8(&attr.value, text, position)?;
        scan.used_prefixes
            .extend(value.split_whitespace().map(str::to_string));
    }
    Ok(())
}
