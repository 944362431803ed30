//! XML reading for 3MF model documents
//!
//! Reads one model part into a [`ModelDocument`]. The converter does not need
//! this (it rewrites the event stream directly); it is used to inspect parts,
//! e.g. for the command-line summary and to verify converted output.

use crate::encoding::decode_xml;
use crate::error::{Error, ErrorContext, Result};
use crate::model::*;
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;

impl ModelDocument {
    /// Parse a model part from its raw bytes
    ///
    /// The declared character encoding is honoured (see [`crate::encoding`]).
    ///
    /// # Example
    ///
    /// ```
    /// use bambu2prusa::ModelDocument;
    ///
    /// let xml = br#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
    ///   <resources><object id="1" type="model"/></resources>
    ///   <build><item objectid="1"/></build>
    /// </model>"#;
    /// let doc = ModelDocument::parse(xml).unwrap();
    /// assert_eq!(doc.objects.len(), 1);
    /// assert_eq!(doc.build_items[0].transform, None);
    /// ```
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        parse_model_document(bytes)
    }
}

/// Parse a model part from its raw bytes
pub fn parse_model_document(bytes: &[u8]) -> Result<ModelDocument> {
    let text = decode_xml(bytes)?;
    let mut reader = NsReader::from_str(&text);

    let mut doc = ModelDocument::new();
    let mut stack: Vec<String> = Vec::new();
    let mut seen_root = false;
    let mut has_resources = false;
    let mut has_build = false;
    let mut current_object: Option<Object> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml_error(&text, reader.error_position(), &e))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let local = local_name_of(e)?;

                match stack.len() {
                    0 => {
                        if seen_root {
                            return Err(Error::parse(
                                "Document has more than one root element",
                                location(&text, reader.buffer_position()),
                            ));
                        }
                        seen_root = true;
                        if local != "model" {
                            return Err(Error::structure(format!(
                                "Root element is <{}>, expected <model>",
                                local
                            )));
                        }
                        read_root(&reader, e, &text, &mut doc)?;
                    }
                    1 if local == "resources" => has_resources = true,
                    1 if local == "build" => has_build = true,
                    _ => {}
                }

                let parent = stack.last().map(String::as_str);
                match (parent, local.as_str()) {
                    (Some("resources"), "object") if stack.len() == 2 => {
                        let object = read_object(e, &text, reader.buffer_position())?;
                        if is_empty {
                            doc.objects.push(object);
                        } else {
                            current_object = Some(object);
                        }
                    }
                    (Some("object"), "mesh") => {
                        if let Some(object) = current_object.as_mut() {
                            object.mesh = Some(Mesh::new());
                        }
                    }
                    (Some("vertices"), "vertex") => {
                        if let Some(mesh) = current_object.as_mut().and_then(|o| o.mesh.as_mut()) {
                            mesh.vertices
                                .push(read_vertex(e, &text, reader.buffer_position())?);
                        }
                    }
                    (Some("triangles"), "triangle") => {
                        if let Some(mesh) = current_object.as_mut().and_then(|o| o.mesh.as_mut()) {
                            mesh.triangles
                                .push(read_triangle(e, &text, reader.buffer_position())?);
                        }
                    }
                    (Some("components"), "component") => {
                        if let Some(object) = current_object.as_mut() {
                            object.component_count += 1;
                        }
                    }
                    (Some("build"), "item") if stack.len() == 2 => {
                        doc.build_items
                            .push(read_build_item(e, &text, reader.buffer_position())?);
                    }
                    _ => {}
                }

                if !is_empty {
                    stack.push(local);
                }
            }
            Event::End(_) => {
                let closed = stack.pop();
                if closed.as_deref() == Some("object") && stack.len() == 2 {
                    if let Some(object) = current_object.take() {
                        doc.objects.push(object);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(unclosed_element(&text, open));
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

    Ok(doc)
}

fn read_root(
    reader: &NsReader<&[u8]>,
    e: &BytesStart,
    text: &str,
    doc: &mut ModelDocument,
) -> Result<()> {
    let (ns, _) = reader.resolver().resolve_element(e.name());
    if let ResolveResult::Bound(ns) = ns {
        doc.namespace = Some(String::from_utf8_lossy(ns.as_ref()).into_owned());
    }

    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            Error::parse(
                format!("Attribute parsing failed: {}", err),
                location(text, reader.buffer_position()),
            )
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref());
        let value = String::from_utf8_lossy(&attr.value).into_owned();

        if key == "xmlns" {
            doc.root_declarations.push((None, value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            doc.root_declarations.push((Some(prefix.to_string()), value));
        } else if key == "unit" {
            doc.unit = Some(value);
        }
    }

    Ok(())
}

fn read_object(e: &BytesStart, text: &str, position: u64) -> Result<Object> {
    let id = plain_attribute(e, "id", text, position)?
        .ok_or_else(|| missing_attribute("object", "id", text, position))?;

    let mut object = Object::new(id);
    object.object_type = plain_attribute(e, "type", text, position)?
        .map(|value| ObjectType::parse(&value));
    Ok(object)
}

fn read_vertex(e: &BytesStart, text: &str, position: u64) -> Result<Vertex> {
    let mut coords = [0.0f64; 3];
    for (slot, name) in coords.iter_mut().zip(["x", "y", "z"]) {
        let value = plain_attribute(e, name, text, position)?
            .ok_or_else(|| missing_attribute("vertex", name, text, position))?;
        *slot = value.trim().parse::<f64>().map_err(|_| {
            invalid_number("vertex", name, &value, "floating-point number", text, position)
        })?;
    }
    Ok(Vertex::new(coords[0], coords[1], coords[2]))
}

fn read_triangle(e: &BytesStart, text: &str, position: u64) -> Result<Triangle> {
    let mut indices = [0usize; 3];
    for (slot, name) in indices.iter_mut().zip(["v1", "v2", "v3"]) {
        let value = plain_attribute(e, name, text, position)?
            .ok_or_else(|| missing_attribute("triangle", name, text, position))?;
        *slot = value.trim().parse::<usize>().map_err(|_| {
            invalid_number("triangle", name, &value, "vertex index", text, position)
        })?;
    }
    Ok(Triangle::new(indices[0], indices[1], indices[2]))
}

fn read_build_item(e: &BytesStart, text: &str, position: u64) -> Result<BuildItem> {
    let objectid = plain_attribute(e, "objectid", text, position)?
        .ok_or_else(|| missing_attribute("item", "objectid", text, position))?;

    let mut item = BuildItem::new(objectid);
    item.transform = plain_attribute(e, "transform", text, position)?;
    Ok(item)
}

/// Value of an unprefixed attribute, unescaped
fn plain_attribute(
    e: &BytesStart,
    name: &str,
    text: &str,
    position: u64,
) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            Error::parse(
                format!("Attribute parsing failed: {}", err),
                location(text, position),
            )
        })?;
        if attr.key.as_ref() != name.as_bytes() {
            continue;
        }
        let raw = std::str::from_utf8(&attr.value)
            .map_err(|err| Error::parse(err.to_string(), location(text, position)))?;
        let value = quick_xml::escape::unescape(raw)
            .map_err(|err| Error::parse(err.to_string(), location(text, position)))?;
        return Ok(Some(value.into_owned()));
    }
    Ok(None)
}

fn missing_attribute(element: &str, attribute: &str, text: &str, position: u64) -> Error {
    Error::parse(
        format!(
            "Element '<{}>' is missing required attribute '{}'",
            element, attribute
        ),
        location(text, position),
    )
}

fn invalid_number(
    element: &str,
    attribute: &str,
    value: &str,
    expected: &str,
    text: &str,
    position: u64,
) -> Error {
    Error::parse(
        format!(
            "Failed to parse '{}' of <{}>: expected {}, got '{}'",
            attribute, element, expected, value
        ),
        location(text, position),
    )
}

/// Local name of an element as an owned string
pub(crate) fn local_name_of(e: &BytesStart) -> Result<String> {
    std::str::from_utf8(e.local_name().as_ref())
        .map(str::to_string)
        .map_err(|err| Error::parse(err.to_string(), ErrorContext::new()))
}

/// Convert a byte offset in `text` into 1-based line and column numbers
pub(crate) fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let mut end = offset.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let before = &text[..end];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

/// Error context pointing at a byte offset in `text`
pub(crate) fn location(text: &str, offset: u64) -> ErrorContext {
    let (line, column) = line_column(text, usize::try_from(offset).unwrap_or(usize::MAX));
    ErrorContext::new().line(line).column(column).offset(offset)
}

/// Wrap a quick-xml failure with its location
pub(crate) fn xml_error(text: &str, offset: u64, err: &quick_xml::Error) -> Error {
    Error::parse(err.to_string(), location(text, offset))
}

/// Error for a document that ends while `element` is still open
pub(crate) fn unclosed_element(text: &str, element: &str) -> Error {
    Error::parse(
        format!("Unexpected end of document: <{}> is not closed", element),
        location(text, text.len() as u64).hint("The model part may be truncated"),
    )
}
