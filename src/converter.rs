//! Package conversion
//!
//! Reads a Bambu Studio package, rewrites every model part with a
//! [`ModelRewriter`] and copies all other entries byte-for-byte.

use crate::error::Result;
use crate::model::ModelDocument;
use crate::opc::{Package, PackageWriter, PartKind, write_atomically};
use crate::rewriter::{ModelRewriter, RewriteRules, RewriteStats};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a conversion did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Entries in the package, directories included
    pub parts: usize,
    /// Model parts rewritten
    pub model_parts: usize,
    /// Entries copied without change
    pub copied_parts: usize,
    /// Totals over all rewritten model parts
    pub stats: RewriteStats,
}

/// Converts Bambu Studio packages into PrusaSlicer packages
///
/// A converter holds no state between calls; one instance can convert any
/// number of packages, also from several threads.
///
/// # Example
///
/// ```no_run
/// use bambu2prusa::Converter;
///
/// let converter = Converter::new();
/// let out = converter.convert_archive("benchy.3mf", "benchy_prusa.3mf")?;
/// println!("wrote {}", out.display());
/// # Ok::<(), bambu2prusa::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Converter {
    rewriter: ModelRewriter,
}

impl Converter {
    /// Create a converter with the PrusaSlicer rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a converter with custom rewrite rules
    pub fn with_rules(rules: RewriteRules) -> Self {
        Self {
            rewriter: ModelRewriter::new(rules),
        }
    }

    /// Rules in use
    pub fn rules(&self) -> &RewriteRules {
        self.rewriter.rules()
    }

    /// Convert a package from `reader` into `writer`
    ///
    /// Entries are written in their original order. Errors from a model part
    /// carry the part name.
    pub fn transcode<R, W>(&self, reader: R, writer: W) -> Result<ConversionSummary>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        let mut package = Package::open(reader)?;
        let parts = package.parts()?;
        let mut out = PackageWriter::new(writer);

        let mut summary = ConversionSummary {
            parts: parts.len(),
            ..ConversionSummary::default()
        };

        for part in &parts {
            match part.kind {
                PartKind::Model => {
                    let (content, meta) = package.read_part(part.index)?;
                    let (rewritten, stats) = self
                        .rewriter
                        .rewrite_with_stats(&content)
                        .map_err(|e| e.in_part(&part.name))?;
                    debug!(
                        part = %part.name,
                        bytes_in = content.len(),
                        bytes_out = rewritten.len(),
                        attributes_stripped = stats.attributes_stripped,
                        transforms_added = stats.transforms_added,
                        "rewrote model part"
                    );
                    out.write_part(&part.name, &rewritten, &meta)?;
                    summary.model_parts += 1;
                    summary.stats += stats;
                }
                PartKind::Directory | PartKind::Opaque => {
                    debug!(part = %part.name, kind = ?part.kind, "copying entry");
                    out.copy_entry(&mut package, part.index)?;
                    summary.copied_parts += 1;
                }
            }
        }

        if summary.model_parts == 0 {
            warn!("package contains no model parts; entries were copied unchanged");
        }

        let mut writer = out.finish()?;
        writer.flush()?;
        Ok(summary)
    }

    /// Convert the package at `source` into a new file at `destination`
    ///
    /// The destination is only created or replaced once the whole package
    /// has been written.
    pub fn convert_file(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> Result<ConversionSummary> {
        let source = source.as_ref();
        let destination = destination.as_ref();
        info!(
            source = %source.display(),
            destination = %destination.display(),
            "converting package"
        );

        let input = BufReader::new(File::open(source)?);
        let summary = write_atomically(destination, |file| {
            self.transcode(input, BufWriter::new(file))
        })?;

        info!(
            parts = summary.parts,
            model_parts = summary.model_parts,
            attributes_stripped = summary.stats.attributes_stripped,
            transforms_added = summary.stats.transforms_added,
            "conversion finished"
        );
        Ok(summary)
    }

    /// Convert the package at `source` and return the destination path
    pub fn convert_archive(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        self.convert_file(source, destination.as_ref())?;
        Ok(destination.as_ref().to_path_buf())
    }
}

/// Convert the package at `source` with the PrusaSlicer rules
///
/// Either the destination holds the complete converted package afterwards,
/// or the call failed and any previous destination file is untouched.
pub fn convert_archive(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<PathBuf> {
    Converter::new().convert_archive(source, destination)
}

/// Read every model part of a package
///
/// Returns part names with their documents, in archive order.
pub fn model_documents<R: Read + Seek>(reader: R) -> Result<Vec<(String, ModelDocument)>> {
    let mut package = Package::open(reader)?;
    let mut documents = Vec::new();
    for part in package.parts()? {
        if part.kind != PartKind::Model {
            continue;
        }
        let (content, _) = package.read_part(part.index)?;
        let document = ModelDocument::parse(&content).map_err(|e| e.in_part(&part.name))?;
        documents.push((part.name, document));
    }
    Ok(documents)
}
