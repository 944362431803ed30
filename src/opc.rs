//! OPC (Open Packaging Conventions) handling for 3MF files
//!
//! 3MF files are ZIP archives following the OPC standard. This module reads
//! the package descriptors, decides which parts are model documents, and
//! writes the converted archive.

mod content_types;
mod reader;
mod relationships;
mod validation;
mod writer;

pub use content_types::ContentTypes;
pub use reader::{EntryMeta, Package, PartInfo, PartKind};
pub use relationships::{Relationship, parse_relationships, resolve_target, source_part_of};
pub use writer::{PackageWriter, write_atomically};

pub(crate) use validation::{part_key, validate_opc_part_name};

use crate::error::{Error, Result};
use quick_xml::events::attributes::Attribute;

/// Content types file path
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Root relationships file path
pub const RELS_PATH: &str = "_rels/.rels";

/// Main model file path written by most producers
pub const MODEL_PATH: &str = "3D/3dmodel.model";

/// 3D model relationship type
pub const MODEL_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

/// Content type of 3D model parts
pub const MODEL_CONTENT_TYPE: &str = "application/vnd.ms-package.3dmanufacturing-3dmodel+xml";

/// Unescaped value of a descriptor attribute
pub(crate) fn attribute_value(attr: &Attribute, part: &str) -> Result<String> {
    let raw = std::str::from_utf8(&attr.value)
        .map_err(|err| Error::invalid_package(part, &err.to_string()))?;
    quick_xml::escape::unescape(raw)
        .map(|value| value.into_owned())
        .map_err(|err| Error::invalid_package(part, &err.to_string()))
}
