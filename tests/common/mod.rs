//! Shared fixtures for the integration tests
//!
//! Packages are assembled in memory with `zip::ZipWriter`, the way Bambu
//! Studio lays them out.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
 <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
 <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
 <Default Extension="png" ContentType="image/png"/>
</Types>"#;

pub const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
 <Relationship Target="/3D/3dmodel.model" Id="rel-1" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
 <Relationship Target="/Metadata/plate_1.png" Id="rel-2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail"/>
</Relationships>"#;

pub const MODEL_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
 <Relationship Target="/3D/Objects/object_1.model" Id="rel-1" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;

/// Primary model part: vendor namespace, vendor attributes, one build item without transform
pub const BAMBU_MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:BambuStudio="http://schemas.bambulab.com/package/2021" xmlns:p="http://schemas.microsoft.com/packaging/2006/relationships" requiredextensions="p" p:UUID="bambu-test-uuid" paint_color="ff0000" paint_seam="EDGE">
 <metadata name="Application">BambuStudio-01.09.07.52</metadata>
 <metadata name="BambuStudio:3mfVersion">1</metadata>
 <resources>
  <object id="1" type="model">
   <mesh>
    <vertices>
     <vertex x="0" y="0" z="0"/>
     <vertex x="1" y="0" z="0"/>
     <vertex x="0" y="1" z="0"/>
    </vertices>
    <triangles>
     <triangle v1="0" v2="1" v3="2"/>
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

/// Model part in a vendor default namespace (Scenario A of the converter contract)
pub const VENDOR_NAMESPACE_MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model xmlns="http://www.bambulab.com/schemas/3mf/2023" xmlns:p="http://schemas.microsoft.com/packaging/2006/relationships" p:UUID="bambu-test-uuid" paint_color="ff0000" paint_seam="EDGE">
  <metadata xml:lang="en-US" name="Title">Bambu Test Model</metadata>
  <resources>
    <object id="1" type="model">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0" />
          <vertex x="1" y="0" z="0" />
          <vertex x="0" y="1" z="0" />
        </vertices>
        <triangles>
          <triangle v1="0" v2="1" v3="2" />
        </triangles>
      </mesh>
    </object>
    <object id="2" type="support" />
  </resources>
  <build>
    <item objectid="1" transform="1 0 0 0 1 0 0 0 1 0 0 0" />
    <item objectid="2" />
  </build>
</model>"#;

/// Sub-model part holding per-object meshes with painted triangles
pub const OBJECT_MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:BambuStudio="http://schemas.bambulab.com/package/2021" xmlns:p="http://schemas.microsoft.com/packaging/2006/relationships" requiredextensions="p">
 <metadata name="BambuStudio:3mfVersion">1</metadata>
 <resources>
  <object id="1" p:UUID="00010000-81cb-4c03-9d28-80fed5dfa1dc" type="model">
   <mesh>
    <vertices>
     <vertex x="-10" y="-10" z="0"/>
     <vertex x="10" y="-10" z="0"/>
     <vertex x="0" y="10" z="0"/>
     <vertex x="0" y="0" z="15.5"/>
    </vertices>
    <triangles>
     <triangle v1="0" v2="2" v3="1" paint_color="4"/>
     <triangle v1="0" v2="1" v3="3" paint_seam="8"/>
     <triangle v1="1" v2="2" v3="3"/>
     <triangle v1="2" v2="0" v3="3" paint_color="0C"/>
    </triangles>
   </mesh>
  </object>
 </resources>
 <build/>
</model>"#;

pub const MODEL_SETTINGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<config>
  <object id="2">
    <metadata key="name" value="Cube"/>
    <metadata key="extruder" value="1"/>
  </object>
</config>"#;

pub const THUMBNAIL: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR fake thumbnail bytes";

/// One archive entry; names ending in `/` become directories
pub struct Entry<'a> {
    pub name: &'a str,
    pub content: &'a [u8],
    pub method: CompressionMethod,
}

impl<'a> Entry<'a> {
    pub fn deflated(name: &'a str, content: &'a [u8]) -> Self {
        Self {
            name,
            content,
            method: CompressionMethod::Deflated,
        }
    }

    pub fn stored(name: &'a str, content: &'a [u8]) -> Self {
        Self {
            name,
            content,
            method: CompressionMethod::Stored,
        }
    }
}

/// Build a package from entries, in order
pub fn build_package(entries: &[Entry]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        let options = SimpleFileOptions::default().compression_method(entry.method);
        if entry.name.ends_with('/') {
            zip.add_directory(entry.name, options).unwrap();
        } else {
            zip.start_file(entry.name, options).unwrap();
            zip.write_all(entry.content).unwrap();
        }
    }
    zip.finish().unwrap().into_inner()
}

/// A Bambu Studio style package with a primary model and one sub-model
pub fn bambu_package() -> Vec<u8> {
    build_package(&[
        Entry::deflated("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        Entry::deflated("_rels/.rels", ROOT_RELS.as_bytes()),
        Entry::deflated("3D/", b""),
        Entry::deflated("3D/3dmodel.model", BAMBU_MODEL.as_bytes()),
        Entry::deflated("3D/_rels/3dmodel.model.rels", MODEL_RELS.as_bytes()),
        Entry::deflated("3D/Objects/object_1.model", OBJECT_MODEL.as_bytes()),
        Entry::stored("Metadata/plate_1.png", THUMBNAIL),
        Entry::deflated("Metadata/model_settings.config", MODEL_SETTINGS.as_bytes()),
    ])
}

/// A package whose only model part is `model`
pub fn single_model_package(model: &str) -> Vec<u8> {
    build_package(&[
        Entry::deflated("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        Entry::deflated("_rels/.rels", ROOT_RELS.as_bytes()),
        Entry::deflated("3D/3dmodel.model", model.as_bytes()),
    ])
}

/// Write package bytes to `dir/name`
pub fn write_package(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Entry names in archive order
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect::<Vec<_>>()
}

/// Decompressed content of one entry
pub fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = Vec::new();
    file.read_to_end(&mut content).unwrap();
    content
}

/// Compressed bytes and compression method of one entry
pub fn raw_entry(bytes: &[u8], name: &str) -> (Vec<u8>, CompressionMethod) {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let index = archive.index_for_name(name).unwrap();
    let mut file = archive.by_index_raw(index).unwrap();
    let method = file.compression();
    let mut content = Vec::new();
    file.read_to_end(&mut content).unwrap();
    (content, method)
}

/// Decompressed entry as text
pub fn read_entry_string(bytes: &[u8], name: &str) -> String {
    String::from_utf8(read_entry(bytes, name)).unwrap()
}
