//! Model document rewriting
//!
//! Turns one Bambu Studio model part into the dialect PrusaSlicer reads:
//!
//! - the root element is rebound to the 3MF core namespace, whatever vendor
//!   namespace it used before, and always declares the `slic3rpe` namespace
//! - vendor attributes (packaging `UUID` on the root, `paint_color` and
//!   `paint_seam` anywhere) are removed, matched by namespace URI and local
//!   name rather than by prefix
//! - every `build/item` carries a `transform`; missing ones get the identity
//!   placement, existing ones are kept byte-for-byte
//!
//! Everything else (objects, meshes, comments, text, unknown attributes) is
//! streamed through untouched. The document is read twice: the first pass
//! checks its shape and works out which namespace prefixes survive, the second
//! writes the result.

mod attributes;
mod namespaces;

pub use attributes::{AttributeScope, NamespaceMatch, StrippedAttribute};

use crate::encoding::decode_xml;
use crate::error::{Error, Result};
use crate::model::{
    CORE_NAMESPACE, DEFAULT_TRANSFORM, PACKAGE_RELATIONSHIPS_NAMESPACE, SLIC3RPE_NAMESPACE,
    SLIC3RPE_PREFIX,
};
use crate::parser::{location, xml_error};
use namespaces::{DocumentScan, utf8};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{NsReader, Writer};

pub(crate) use namespaces::Resolved;

/// Configuration of the rewrite
///
/// [`RewriteRules::prusa`] (also the [`Default`]) is the PrusaSlicer rule
/// set. Other fields can be adjusted with the builder methods.
///
/// # Example
///
/// ```
/// use bambu2prusa::{RewriteRules, StrippedAttribute};
///
/// let rules = RewriteRules::prusa()
///     .with_stripped_attribute(StrippedAttribute::any_namespace("paint_supports"));
/// assert_eq!(rules.stripped_attributes().len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRules {
    model_namespace: String,
    extension_namespace: String,
    extension_prefix: String,
    default_transform: String,
    stripped: Vec<StrippedAttribute>,
}

impl RewriteRules {
    /// The PrusaSlicer rule set
    pub fn prusa() -> Self {
        Self {
            model_namespace: CORE_NAMESPACE.to_string(),
            extension_namespace: SLIC3RPE_NAMESPACE.to_string(),
            extension_prefix: SLIC3RPE_PREFIX.to_string(),
            default_transform: DEFAULT_TRANSFORM.to_string(),
            stripped: vec![
                StrippedAttribute::in_namespace(PACKAGE_RELATIONSHIPS_NAMESPACE, "UUID").on_root(),
                StrippedAttribute::any_namespace("paint_color"),
                StrippedAttribute::any_namespace("paint_seam"),
            ],
        }
    }

    /// Set the namespace the root element is rebound to
    pub fn with_model_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.model_namespace = namespace.into();
        self
    }

    /// Set the extension namespace declared on the root element, and its prefix
    pub fn with_extension_namespace(
        mut self,
        namespace: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        self.extension_namespace = namespace.into();
        self.extension_prefix = prefix.into();
        self
    }

    /// Set the transform given to build items that have none
    pub fn with_default_transform(mut self, transform: impl Into<String>) -> Self {
        self.default_transform = transform.into();
        self
    }

    /// Strip one more attribute
    pub fn with_stripped_attribute(mut self, attribute: StrippedAttribute) -> Self {
        self.stripped.push(attribute);
        self
    }

    /// Target model namespace
    pub fn model_namespace(&self) -> &str {
        &self.model_namespace
    }

    /// Extension namespace declared on the root element
    pub fn extension_namespace(&self) -> &str {
        &self.extension_namespace
    }

    /// Prefix bound to [`Self::extension_namespace`]
    pub fn extension_prefix(&self) -> &str {
        &self.extension_prefix
    }

    /// Transform given to build items that have none
    pub fn default_transform(&self) -> &str {
        &self.default_transform
    }

    /// Attributes removed from the document
    pub fn stripped_attributes(&self) -> &[StrippedAttribute] {
        &self.stripped
    }

    pub(crate) fn is_stripped(&self, namespace: Resolved<'_>, local_name: &[u8], is_root: bool) -> bool {
        self.stripped
            .iter()
            .any(|rule| rule.matches(namespace, local_name, is_root))
    }
}

impl Default for RewriteRules {
    fn default() -> Self {
        Self::prusa()
    }
}

/// Counters collected while rewriting one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Vendor attributes removed
    pub attributes_stripped: usize,
    /// Build items that received the default transform
    pub transforms_added: usize,
    /// Namespace declarations dropped because nothing used them any more
    pub declarations_dropped: usize,
}

impl std::ops::AddAssign for RewriteStats {
    fn add_assign(&mut self, other: Self) {
        self.attributes_stripped += other.attributes_stripped;
        self.transforms_added += other.transforms_added;
        self.declarations_dropped += other.declarations_dropped;
    }
}

/// Default namespace in scope in the output document
#[derive(Debug, Clone, PartialEq, Eq)]
enum DefaultNamespace {
    Target,
    Uri(String),
    Empty,
}

/// An element open in the output document
struct OpenElement {
    name: String,
    default_namespace: DefaultNamespace,
    /// Local name when the element belongs to the model vocabulary
    model_local: Option<String>,
}

/// Rewrites model documents according to a [`RewriteRules`]
#[derive(Debug, Clone, Default)]
pub struct ModelRewriter {
    rules: RewriteRules,
}

impl ModelRewriter {
    /// Create a rewriter
    pub fn new(rules: RewriteRules) -> Self {
        Self { rules }
    }

    /// Rules in use
    pub fn rules(&self) -> &RewriteRules {
        &self.rules
    }

    /// Rewrite one model document
    ///
    /// Returns UTF-8 XML with a standard prologue.
    ///
    /// # Errors
    ///
    /// - [`Error::Encoding`] when the bytes cannot be decoded
    /// - [`Error::Parse`] when the document is not well-formed
    /// - [`Error::Structure`] when it lacks `model`, `resources` or `build`
    pub fn rewrite(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.rewrite_with_stats(bytes).map(|(out, _)| out)
    }

    /// Rewrite one model document and report what changed
    pub fn rewrite_with_stats(&self, bytes: &[u8]) -> Result<(Vec<u8>, RewriteStats)> {
        let text = decode_xml(bytes)?;
        let scan = namespaces::scan(&text, &self.rules)?;
        let mut stats = RewriteStats::default();
        let out = self.emit(&text, &scan, &mut stats)?;
        Ok((out, stats))
    }

    fn emit(&self, text: &str, scan: &DocumentScan, stats: &mut RewriteStats) -> Result<Vec<u8>> {
        let mut reader = NsReader::from_str(text);
        let mut writer = Writer::new(Vec::with_capacity(text.len() + 128));
        write_event(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;

        let mut open: Vec<OpenElement> = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| xml_error(text, reader.error_position(), &e))?;

            match event {
                Event::Decl(_) => {}
                Event::Start(e) => {
                    let (start, element) = self.rewrite_start(&reader, &e, &open, text, scan, stats)?;
                    write_event(&mut writer, Event::Start(start))?;
                    open.push(element);
                }
                Event::Empty(e) => {
                    let (start, _) = self.rewrite_start(&reader, &e, &open, text, scan, stats)?;
                    write_event(&mut writer, Event::Empty(start))?;
                }
                Event::End(_) => {
                    let element = open.pop().ok_or_else(|| {
                        Error::parse(
                            "Closing tag without a matching opening tag",
                            location(text, reader.buffer_position()),
                        )
                    })?;
                    write_event(&mut writer, Event::End(BytesEnd::new(element.name)))?;
                }
                Event::Eof => break,
                other => write_event(&mut writer, other)?,
            }
        }

        Ok(writer.into_inner())
    }

    fn rewrite_start(
        &self,
        reader: &NsReader<&[u8]>,
        e: &BytesStart,
        open: &[OpenElement],
        text: &str,
        scan: &DocumentScan,
        stats: &mut RewriteStats,
    ) -> Result<(BytesStart<'static>, OpenElement)> {
        let position = reader.buffer_position();
        let is_root = open.is_empty();
        let (ns, local) = reader.resolver().resolve_element(e.name());
        let resolved = Resolved::of(&ns);
        let local = utf8(local.as_ref(), text, position)?;
        let is_model = scan.is_model_namespace(resolved, &self.rules);

        let (name, wanted_default) = if is_model {
            (local.to_string(), Some(DefaultNamespace::Target))
        } else {
            let qname = utf8(e.name().as_ref(), text, position)?.to_string();
            let wanted = match (e.name().prefix(), resolved) {
                (Some(_), _) => None,
                (None, Resolved::Uri(uri)) => Some(DefaultNamespace::Uri(
                    String::from_utf8_lossy(uri).into_owned(),
                )),
                (None, _) => Some(DefaultNamespace::Empty),
            };
            (qname, wanted)
        };

        let inherited = open
            .last()
            .map(|parent| parent.default_namespace.clone())
            .unwrap_or(DefaultNamespace::Empty);

        let mut start = BytesStart::new(name.clone());
        let mut default_namespace = inherited.clone();
        if let Some(wanted) = wanted_default {
            if wanted != inherited {
                match &wanted {
                    DefaultNamespace::Target => {
                        start.push_attribute(("xmlns", self.rules.model_namespace()))
                    }
                    DefaultNamespace::Uri(uri) => start.push_attribute(("xmlns", uri.as_str())),
                    DefaultNamespace::Empty => start.push_attribute(("xmlns", "")),
                }
                default_namespace = wanted;
            }
        }
        if is_root {
            let key = format!("xmlns:{}", self.rules.extension_prefix());
            start.push_attribute((key.as_str(), self.rules.extension_namespace()));
        }

        let mut has_transform = false;
        for attr in e.attributes() {
            let attr = attr.map_err(|err| {
                Error::parse(
                    format!("Attribute parsing failed: {}", err),
                    location(text, position),
                )
            })?;
            let key = attr.key.as_ref();

            if key == b"xmlns" {
                continue;
            }
            if let Some(prefix) = key.strip_prefix(b"xmlns:") {
                if is_root && prefix == self.rules.extension_prefix().as_bytes() {
                    continue;
                }
                if !scan.is_used(prefix) {
                    stats.declarations_dropped += 1;
                    continue;
                }
                push_verbatim(&mut start, attr, text, position)?;
                continue;
            }

            let (attr_ns, attr_local) = reader.resolver().resolve_attribute(attr.key);
            if self
                .rules
                .is_stripped(Resolved::of(&attr_ns), attr_local.as_ref(), is_root)
            {
                stats.attributes_stripped += 1;
                continue;
            }

            has_transform |= key == b"transform";
            push_verbatim(&mut start, attr, text, position)?;
        }

        let in_build = open
            .last()
            .and_then(|parent| parent.model_local.as_deref())
            == Some("build");
        if is_model && local == "item" && in_build && !has_transform {
            start.push_attribute(("transform", self.rules.default_transform()));
            stats.transforms_added += 1;
        }

        let element = OpenElement {
            name,
            default_namespace,
            model_local: is_model.then(|| local.to_string()),
        };
        Ok((start, element))
    }
}

/// Copy an attribute keeping its escaped value as written
///
/// Values that contain a double quote (legal inside single quotes) are
/// re-escaped, since the writer always uses double quotes.
fn push_verbatim(start: &mut BytesStart, attr: Attribute, text: &str, position: u64) -> Result<()> {
    if !attr.value.contains(&b'"') {
        start.push_attribute(attr);
        return Ok(());
    }
    let key = utf8(attr.key.as_ref(), text, position)?;
    let raw = utf8(&attr.value, text, position)?;
    let value = quick_xml::escape::unescape(raw)
        .map_err(|err| Error::parse(err.to_string(), location(text, position)))?;
    start.push_attribute((key, value.as_ref()));
    Ok(())
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::xml_write(e.to_string()))
}

/// Rewrite one model document with the PrusaSlicer rules
///
/// # Example
///
/// ```
/// let bambu = br#"<?xml version="1.0" encoding="UTF-8"?>
/// <model xmlns="http://schemas.bambulab.com/package/2021" paint_color="4">
///   <resources/>
///   <build><item objectid="1"/></build>
/// </model>"#;
///
/// let out = String::from_utf8(bambu2prusa::rewrite(bambu).unwrap()).unwrap();
/// assert!(out.contains(r#"xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02""#));
/// assert!(out.contains(r#"transform="1 0 0 0 1 0 0 0 1 0 0 0""#));
/// assert!(!out.contains("paint_color"));
/// ```
pub fn rewrite(bytes: &[u8]) -> Result<Vec<u8>> {
    ModelRewriter::default().rewrite(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelDocument;
    use crate::ErrorKind;

    const BAMBU_MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.bambulab.com/package/2021" xmlns:p="http://schemas.microsoft.com/packaging/2006/relationships" xmlns:BambuStudio="http://schemas.bambulab.com/package/2021" p:UUID="bambu-test-uuid" paint_color="ff0000" paint_seam="EDGE" requiredextensions="p">
  <metadata name="Application">BambuStudio-01.09</metadata>
  <resources>
    <object id="1" type="model" p:UUID="00010000-81cb-4c03-9d28-80fed5dfa1dc">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="0" y="10" z="0"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="1" v3="2" paint_color="8"/>
        </triangles>
      </mesh>
    </object>
    <object id="2" type="support"/>
  </resources>
  <build p:UUID="2c7c17d8-22b5-4d84-8835-1976022ea369">
    <item objectid="1" transform="1 0 0 0 1 0 0 0 1 0 0 0" printable="1"/>
    <item objectid="2"/>
  </build>
</model>"#;

    fn rewrite_str(xml: &str) -> String {
        String::from_utf8(rewrite(xml.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn test_rebinds_root_and_declares_extension() {
        let out = rewrite_str(BAMBU_MODEL);
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(out.contains(&format!(
            r#"<model xmlns="{}" xmlns:slic3rpe="{}""#,
            CORE_NAMESPACE, SLIC3RPE_NAMESPACE
        )));
        assert!(!out.contains("bambulab.com/package"));
        assert!(out.contains(r#"xml:lang="en-US""#));

        let doc = ModelDocument::parse(out.as_bytes()).unwrap();
        assert_eq!(doc.namespace.as_deref(), Some(CORE_NAMESPACE));
    }

    #[test]
    fn test_strips_vendor_attributes() {
        let (out, stats) = ModelRewriter::default()
            .rewrite_with_stats(BAMBU_MODEL.as_bytes())
            .unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(!out.contains("paint_color"));
        assert!(!out.contains("paint_seam"));
        assert!(!out.contains(r#"UUID="bambu-test-uuid""#));
        // only the root UUID is a stripped attribute
        assert!(out.contains(r#"p:UUID="00010000-81cb-4c03-9d28-80fed5dfa1dc""#));
        assert_eq!(stats.attributes_stripped, 4);
    }

    #[test]
    fn test_completes_transforms() {
        let (out, stats) = ModelRewriter::default()
            .rewrite_with_stats(BAMBU_MODEL.as_bytes())
            .unwrap();
        let doc = ModelDocument::parse(&out).unwrap();

        assert_eq!(stats.transforms_added, 1);
        assert_eq!(
            doc.build_items[0].transform.as_deref(),
            Some("1 0 0 0 1 0 0 0 1 0 0 0")
        );
        assert_eq!(doc.build_items[1].transform.as_deref(), Some(DEFAULT_TRANSFORM));
    }

    #[test]
    fn test_existing_transform_kept_verbatim() {
        let xml = r#"<model xmlns="http://vendor"><resources/><build>
            <item objectid="1" transform="1.0 0 0 0 1.0 0 0 0 1.0 128.5 128.5 2.40000010"/>
        </build></model>"#;
        let out = rewrite_str(xml);
        assert!(out.contains(r#"transform="1.0 0 0 0 1.0 0 0 0 1.0 128.5 128.5 2.40000010""#));
        assert_eq!(out.matches("transform=").count(), 1);
    }

    #[test]
    fn test_objects_and_geometry_preserved() {
        let before = ModelDocument::parse(BAMBU_MODEL.as_bytes()).unwrap();
        let after = ModelDocument::parse(rewrite_str(BAMBU_MODEL).as_bytes()).unwrap();
        assert_eq!(before.objects, after.objects);
    }

    #[test]
    fn test_unused_declarations_dropped() {
        let xml = r#"<model xmlns="http://vendor" xmlns:p="http://schemas.microsoft.com/packaging/2006/relationships" xmlns:unused="http://unused" p:UUID="x"><resources/><build/></model>"#;
        let (out, stats) = ModelRewriter::default().rewrite_with_stats(xml.as_bytes()).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(!out.contains("xmlns:p="));
        assert!(!out.contains("xmlns:unused"));
        assert_eq!(stats.declarations_dropped, 2);
    }

    #[test]
    fn test_required_extension_prefix_kept() {
        let out = rewrite_str(BAMBU_MODEL);
        assert!(out.contains(r#"xmlns:p="http://schemas.microsoft.com/packaging/2006/relationships""#));
        assert!(out.contains(r#"requiredextensions="p""#));
    }

    #[test]
    fn test_prefixed_source_namespace() {
        let xml = r#"<b:model xmlns:b="http://vendor" xmlns:x="http://x"><b:resources><b:object id="1" x:tag="a"/></b:resources><b:build><b:item objectid="1"/></b:build></b:model>"#;
        let out = rewrite_str(xml);
        assert!(out.contains(r#"<resources><object id="1" x:tag="a"/></resources>"#));
        assert!(out.contains(&format!(r#"<item objectid="1" transform="{}"/>"#, DEFAULT_TRANSFORM)));
        assert!(out.ends_with("</model>"));
        assert!(!out.contains("xmlns:b"));
        assert!(out.contains(r#"xmlns:x="http://x""#));
    }

    #[test]
    fn test_foreign_default_namespace_is_redeclared() {
        let xml = r#"<model xmlns="http://vendor"><resources/><build/><extra xmlns="http://other"><inner/></extra></model>"#;
        let out = rewrite_str(xml);
        assert!(out.contains(r#"<extra xmlns="http://other"><inner/></extra>"#));
    }

    #[test]
    fn test_existing_extension_declaration_replaced() {
        let xml = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:slic3rpe="http://schemas.slic3r.org/3mf/2017/06" slic3rpe:Version3mf="1"><resources/><build/></model>"#;
        let out = rewrite_str(xml);
        assert_eq!(out.matches("xmlns:slic3rpe=").count(), 1);
        assert!(out.contains(r#"slic3rpe:Version3mf="1""#));
    }

    #[test]
    fn test_comments_and_text_pass_through() {
        let xml = "<model xmlns=\"http://vendor\"><!-- keep --><metadata name=\"Title\">A &amp; B</metadata><resources/><build/></model>";
        let out = rewrite_str(xml);
        assert!(out.contains("<!-- keep -->"));
        assert!(out.contains("A &amp; B"));
    }

    #[test]
    fn test_single_quoted_value_with_double_quote() {
        let xml = r#"<model xmlns="http://vendor"><metadata name='say "hi"'/><resources/><build/></model>"#;
        let out = rewrite_str(xml);
        assert!(out.contains(r#"name="say &quot;hi&quot;""#));
        assert!(ModelDocument::parse(out.as_bytes()).is_ok());
    }

    #[test]
    fn test_idempotent_on_target_dialect() {
        let once = rewrite_str(BAMBU_MODEL);
        let twice = rewrite_str(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_utf16_input() {
        let xml = BAMBU_MODEL.replace("UTF-8", "UTF-16");
        let mut bytes = vec![0xFF, 0xFE];
        for unit in xml.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let out = String::from_utf8(rewrite(&bytes).unwrap()).unwrap();
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(!out.contains("paint_seam"));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            rewrite(b"<model><resources>").unwrap_err().kind(),
            ErrorKind::Parse
        );
        assert_eq!(
            rewrite(b"<model><resources/></model>").unwrap_err().kind(),
            ErrorKind::Structure
        );
    }

    #[test]
    fn test_undeclared_prefix_is_rejected() {
        let xml = "<?xml version='1.0' encoding='UTF-16'?>\n\
            <model xmlns=\"http://example.com\" p:UUID=\"123\" paint_color=\"abc\">\
            <resources/><build/></model>";
        let err = rewrite(xml.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("Namespace prefix 'p' is not declared"));
    }

    #[test]
    fn test_trailing_text_is_rejected() {
        let err = rewrite(br#"<model xmlns="http://v"><resources/><build/></model>trailing"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_trailing_whitespace_is_kept_well_formed() {
        let out = rewrite(b"<model xmlns=\"http://v\"><resources/><build/></model>\n").unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.ends_with("</model>\n"));
    }

    #[test]
    fn test_custom_rules() {
        let rules = RewriteRules::prusa()
            .with_default_transform("2 0 0 0 2 0 0 0 2 0 0 0")
            .with_stripped_attribute(StrippedAttribute::any_namespace("printable"));
        let xml = r#"<model><resources/><build><item objectid="1" printable="1"/></build></model>"#;
        let out = String::from_utf8(ModelRewriter::new(rules).rewrite(xml.as_bytes()).unwrap()).unwrap();
        assert!(!out.contains("printable"));
        assert!(out.contains(r#"transform="2 0 0 0 2 0 0 0 2 0 0 0""#));
    }
}
