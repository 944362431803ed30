//! Package reading and part classification

use super::{
    CONTENT_TYPES_PATH, ContentTypes, MODEL_CONTENT_TYPE, MODEL_REL_TYPE, RELS_PATH,
    parse_relationships, part_key, resolve_target, source_part_of, validate_opc_part_name,
};
use crate::encoding::decode_xml;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::io::{Read, Seek};
use tracing::{debug, warn};
use zip::{CompressionMethod, DateTime, ZipArchive};

/// How the converter treats a part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// A directory entry of the archive
    Directory,
    /// A 3D model document
    Model,
    /// Anything else, copied verbatim
    Opaque,
}

/// One entry of the archive, in archive order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartInfo {
    /// Index in the archive
    pub index: usize,
    /// Entry name exactly as stored
    pub name: String,
    /// Classification
    pub kind: PartKind,
}

/// Entry metadata carried over to a rewritten part
#[derive(Debug, Clone, Copy)]
pub struct EntryMeta {
    /// Compression method of the source entry
    pub compression: CompressionMethod,
    /// Modification time of the source entry
    pub last_modified: Option<DateTime>,
    /// Unix permissions, if recorded
    pub unix_mode: Option<u32>,
}

/// An opened 3MF package
pub struct Package<R: Read + Seek> {
    archive: ZipArchive<R>,
    content_types: ContentTypes,
    /// Part keys of every `3dmodel` relationship target
    model_targets: HashSet<String>,
}

impl<R: Read + Seek> Package<R> {
    /// Open a package and read its descriptors
    ///
    /// # Errors
    ///
    /// - [`Error::Zip`] when the source is not a ZIP container
    /// - [`Error::MissingPart`] when `[Content_Types].xml` or `_rels/.rels` is absent
    /// - [`Error::InvalidPackage`] when a descriptor is not well-formed
    pub fn open(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        for required in [CONTENT_TYPES_PATH, RELS_PATH] {
            if archive.index_for_name(required).is_none() {
                return Err(Error::MissingPart(required.to_string()));
            }
        }

        let content_types = ContentTypes::parse(&read_descriptor(&mut archive, CONTENT_TYPES_PATH)?)?;

        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        let mut model_targets = HashSet::new();
        let mut has_primary_model = false;

        for name in &names {
            if !name.to_ascii_lowercase().ends_with(".rels") {
                continue;
            }
            let Some(source) = source_part_of(name) else {
                continue;
            };

            // Only the package relationships are required; other .rels parts are
            // copied through even when they cannot be read.
            let rels = read_descriptor(&mut archive, name)
                .and_then(|xml| parse_relationships(&xml, name));
            let rels = match rels {
                Ok(rels) => rels,
                Err(err) if name != RELS_PATH => {
                    warn!(part = %name, "skipping unreadable relationships part: {}", err);
                    continue;
                }
                Err(err) => return Err(err),
            };
            for rel in rels {
                if rel.external || rel.rel_type != MODEL_REL_TYPE {
                    continue;
                }
                let target = resolve_target(&source, &rel.target);
                if let Err(err) = validate_opc_part_name(&target) {
                    warn!(part = %name, target = %rel.target, "{}", err);
                }
                debug!(part = %name, id = %rel.id, target = %target, "model relationship");
                has_primary_model |= source.is_empty();
                model_targets.insert(part_key(&target));
            }
        }

        if !has_primary_model {
            warn!("{} has no 3D model relationship", RELS_PATH);
        }

        let present: HashSet<String> = names.iter().map(|n| part_key(n)).collect();
        for missing in model_targets.difference(&present) {
            warn!(target = %missing, "model relationship points at a part that is not in the package");
        }

        Ok(Self {
            archive,
            content_types,
            model_targets,
        })
    }

    /// Number of entries in the archive
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Whether the archive has no entries
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Content type table of the package
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Whether a part is a 3D model document
    ///
    /// A part qualifies through its content type or by being the target of a
    /// `3dmodel` relationship in any relationships part.
    pub fn is_model_part(&self, name: &str) -> bool {
        self.content_types.content_type_of(name) == Some(MODEL_CONTENT_TYPE)
            || self.model_targets.contains(&part_key(name))
    }

    /// List every entry in archive order
    pub fn parts(&mut self) -> Result<Vec<PartInfo>> {
        let mut parts = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let (name, is_dir) = {
                let file = self.archive.by_index_raw(index)?;
                (file.name().to_string(), file.is_dir())
            };
            let kind = if is_dir {
                PartKind::Directory
            } else if self.is_model_part(&name) {
                PartKind::Model
            } else {
                PartKind::Opaque
            };
            parts.push(PartInfo { index, name, kind });
        }
        Ok(parts)
    }

    /// Read and decompress one entry
    pub fn read_part(&mut self, index: usize) -> Result<(Vec<u8>, EntryMeta)> {
        let mut file = self.archive.by_index(index)?;
        let meta = EntryMeta {
            compression: file.compression(),
            last_modified: file.last_modified(),
            unix_mode: file.unix_mode(),
        };
        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)?;
        Ok((content, meta))
    }

    /// Read one entry by name
    pub fn read_part_by_name(&mut self, name: &str) -> Result<Vec<u8>> {
        let index = self
            .archive
            .index_for_name(name)
            .ok_or_else(|| Error::MissingPart(name.to_string()))?;
        self.read_part(index).map(|(content, _)| content)
    }

    pub(crate) fn archive_mut(&mut self) -> &mut ZipArchive<R> {
        &mut self.archive
    }
}

fn read_descriptor<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut file = archive
        .by_name(name)
        .map_err(|_| Error::MissingPart(name.to_string()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    decode_xml(&bytes)
        .map(|text| text.into_owned())
        .map_err(|err| Error::invalid_package(name, &err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="png" ContentType="image/png"/>
</Types>"#;

    fn zip_with(entries: &[(&str, &str)]) -> Cursor<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
        }
        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn test_package_from_empty_zip() {
        let result = Package::open(zip_with(&[]));
        assert!(matches!(result, Err(Error::MissingPart(ref p)) if p == CONTENT_TYPES_PATH));
    }

    #[test]
    fn test_missing_root_relationships() {
        let result = Package::open(zip_with(&[(CONTENT_TYPES_PATH, CONTENT_TYPES)]));
        assert!(matches!(result, Err(Error::MissingPart(ref p)) if p == RELS_PATH));
    }

    #[test]
    fn test_not_a_zip() {
        let err = Package::open(Cursor::new(b"not a zip".to_vec())).err().unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::Archive);
    }

    #[test]
    fn test_model_parts_found_through_relationships() {
        // No Default for the "model" extension: only relationships identify model parts
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel-1" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;
        let sub_rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="Objects/object_1.model" Id="rel-1" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;

        let mut package = Package::open(zip_with(&[
            (CONTENT_TYPES_PATH, CONTENT_TYPES),
            (RELS_PATH, rels),
            ("3D/", ""),
            ("3D/3dmodel.model", "<model/>"),
            ("3D/_rels/3dmodel.model.rels", sub_rels),
            ("3D/Objects/object_1.model", "<model/>"),
            ("Metadata/plate_1.png", "png"),
        ]))
        .unwrap();

        let parts = package.parts().unwrap();
        let kinds: Vec<(&str, PartKind)> =
            parts.iter().map(|p| (p.name.as_str(), p.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (CONTENT_TYPES_PATH, PartKind::Opaque),
                (RELS_PATH, PartKind::Opaque),
                ("3D/", PartKind::Directory),
                ("3D/3dmodel.model", PartKind::Model),
                ("3D/_rels/3dmodel.model.rels", PartKind::Opaque),
                ("3D/Objects/object_1.model", PartKind::Model),
                ("Metadata/plate_1.png", PartKind::Opaque),
            ]
        );
        assert_eq!(package.len(), 7);
    }

    #[test]
    fn test_model_parts_found_through_content_types() {
        let content_types = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;
        let package = Package::open(zip_with(&[
            (CONTENT_TYPES_PATH, content_types),
            (RELS_PATH, "<Relationships/>"),
            ("3D/Objects/orphan.model", "<model/>"),
        ]))
        .unwrap();
        assert!(package.is_model_part("3D/Objects/orphan.model"));
        assert!(!package.is_model_part(RELS_PATH));
    }

    #[test]
    fn test_malformed_descriptor_is_archive_error() {
        let err = Package::open(zip_with(&[
            (CONTENT_TYPES_PATH, "<Types><Default></Types>"),
            (RELS_PATH, "<Relationships/>"),
        ]))
        .err()
        .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::Archive);
    }

    #[test]
    fn test_malformed_root_relationships_is_archive_error() {
        let err = Package::open(zip_with(&[
            (CONTENT_TYPES_PATH, CONTENT_TYPES),
            (RELS_PATH, "<Relationships><broken"),
        ]))
        .err()
        .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::Archive);
    }

    #[test]
    fn test_malformed_auxiliary_relationships_skipped() {
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel-1" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;
        let mut package = Package::open(zip_with(&[
            (CONTENT_TYPES_PATH, CONTENT_TYPES),
            (RELS_PATH, rels),
            ("3D/3dmodel.model", "<model/>"),
            ("Metadata/plate_1.png", "png"),
            ("Metadata/_rels/plate_1.png.rels", "<Relationships><broken"),
        ]))
        .unwrap();

        assert!(package.is_model_part("3D/3dmodel.model"));
        let parts = package.parts().unwrap();
        let broken = parts
            .iter()
            .find(|p| p.name == "Metadata/_rels/plate_1.png.rels")
            .unwrap();
        assert_eq!(broken.kind, PartKind::Opaque);
    }

    #[test]
    fn test_read_part() {
        let mut package = Package::open(zip_with(&[
            (CONTENT_TYPES_PATH, CONTENT_TYPES),
            (RELS_PATH, "<Relationships/>"),
            ("Metadata/plate_1.png", "png"),
        ]))
        .unwrap();
        assert_eq!(package.read_part_by_name("Metadata/plate_1.png").unwrap(), b"png");
        assert!(matches!(
            package.read_part_by_name("nope"),
            Err(Error::MissingPart(_))
        ));
    }
}
