//! Relationship parts and target resolution

use super::attribute_value;
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use urlencoding::decode;

/// One `<Relationship>` of a relationships part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship id
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target as written (possibly relative and percent-encoded)
    pub target: String,
    /// Whether the target lies outside the package
    pub external: bool,
}

/// Parse the content of a relationships part
///
/// `part` is only used in error messages.
pub fn parse_relationships(xml: &str, part: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut relationships = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() != b"Relationship" {
                    continue;
                }

                let mut id = String::new();
                let mut target = None;
                let mut rel_type = None;
                let mut external = false;

                for attr in e.attributes() {
                    let attr = attr.map_err(|err| Error::invalid_package(part, &err.to_string()))?;
                    let value = attribute_value(&attr, part)?;

                    match attr.key.as_ref() {
                        b"Id" => id = value,
                        b"Target" => target = Some(value),
                        b"Type" => rel_type = Some(value),
                        b"TargetMode" => external = value.eq_ignore_ascii_case("External"),
                        _ => {}
                    }
                }

                if let (Some(target), Some(rel_type)) = (target, rel_type) {
                    relationships.push(Relationship {
                        id,
                        rel_type,
                        target,
                        external,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::invalid_package(
                    part,
                    &format!("{} (at byte {})", e, reader.error_position()),
                ));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Name of the part a relationships part belongs to
///
/// `X/_rels/Y.rels` describes part `X/Y`; `_rels/.rels` describes the
/// package itself, returned as an empty name. Other names are not
/// relationships parts.
pub fn source_part_of(rels_part: &str) -> Option<String> {
    let rels_part = rels_part.strip_prefix('/').unwrap_or(rels_part);
    let (dir, file) = rels_part.rsplit_once('/')?;
    let source_file = file.strip_suffix(".rels")?;

    let parent = if dir == "_rels" {
        ""
    } else {
        dir.strip_suffix("/_rels")?
    };

    if parent.is_empty() {
        Some(source_file.to_string())
    } else {
        Some(format!("{}/{}", parent, source_file))
    }
}

/// Resolve a relationship target to a part name
///
/// The target is percent-decoded and resolved against the directory of the
/// source part. The result has no leading slash.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let decoded = decode(target)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| target.to_string());

    let mut segments: Vec<&str> = Vec::new();
    if !decoded.starts_with('/') {
        if let Some((dir, _)) = source_part.rsplit_once('/') {
            segments.extend(dir.split('/').filter(|s| !s.is_empty()));
        }
    }

    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}
