//! `[Content_Types].xml` parsing

use super::validation::part_key;
use super::{CONTENT_TYPES_PATH, attribute_value};
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;

/// Content type table of a package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    /// Content type by lowercase extension
    defaults: HashMap<String, String>,
    /// Content type by lowercase part name without leading slash
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    /// Parse the content of `[Content_Types].xml`
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut table = Self::default();

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let local = e.local_name();
                    let is_default = local.as_ref() == b"Default";
                    let is_override = local.as_ref() == b"Override";
                    if !is_default && !is_override {
                        continue;
                    }

                    let mut key = None;
                    let mut content_type = None;

                    for attr in e.attributes() {
                        let attr = attr.map_err(|err| {
                            Error::invalid_package(CONTENT_TYPES_PATH, &err.to_string())
                        })?;
                        let value = attribute_value(&attr, CONTENT_TYPES_PATH)?;

                        match attr.key.as_ref() {
                            b"Extension" if is_default => key = Some(value),
                            b"PartName" if is_override => key = Some(value),
                            b"ContentType" => content_type = Some(value),
                            _ => {}
                        }
                    }

                    if let (Some(key), Some(ct)) = (key, content_type) {
                        if is_default {
                            table.defaults.insert(key.to_ascii_lowercase(), ct);
                        } else {
                            table.overrides.insert(part_key(&key), ct);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::invalid_package(
                        CONTENT_TYPES_PATH,
                        &format!(
                            "{} (at byte {})",
                            e,
                            reader.error_position()
                        ),
                    ));
                }
                _ => {}
            }
        }

        Ok(table)
    }

    /// Content type of a part: Override by part name first, then Default by extension
    pub fn content_type_of(&self, part_name: &str) -> Option<&str> {
        if let Some(ct) = self.overrides.get(&part_key(part_name)) {
            return Some(ct);
        }

        let file_name = part_name.rsplit('/').next()?;
        let (_, extension) = file_name.rsplit_once('.')?;
        self.defaults
            .get(&extension.to_ascii_lowercase())
            .map(String::as_str)
    }
}
