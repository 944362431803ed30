//! Package writing functionality

use super::{EntryMeta, Package};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Sizes at or above this need ZIP64 headers
const ZIP64_THRESHOLD: u64 = 0xFFFF_FFFF;

/// Writes the entries of a converted package
pub struct PackageWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
}

impl<W: Write + Seek> PackageWriter<W> {
    /// Start a new archive
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
        }
    }

    /// Copy an entry of `package` without decompressing it
    ///
    /// Name, compression, timestamps and the compressed bytes are kept.
    pub fn copy_entry<R: Read + Seek>(&mut self, package: &mut Package<R>, index: usize) -> Result<()> {
        let file = package.archive_mut().by_index_raw(index)?;
        self.zip.raw_copy_file(file)?;
        Ok(())
    }

    /// Write new content for an entry, keeping the source entry's metadata
    ///
    /// Stored entries stay stored; every other method is written as deflate.
    pub fn write_part(&mut self, name: &str, content: &[u8], meta: &EntryMeta) -> Result<()> {
        let compression = match meta.compression {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let mut options = SimpleFileOptions::default()
            .compression_method(compression)
            .large_file(content.len() as u64 >= ZIP64_THRESHOLD);
        if let Some(modified) = meta.last_modified {
            options = options.last_modified_time(modified);
        }
        if let Some(mode) = meta.unix_mode {
            options = options.unix_permissions(mode);
        }

        self.zip.start_file(name, options)?;
        self.zip.write_all(content)?;
        Ok(())
    }

    /// Write the central directory and return the underlying writer
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}

/// Produce `destination` through a temporary file in the same directory
///
/// `write` fills the temporary file. Only when it succeeds is the file
/// synced and renamed over `destination`; on any failure the temporary file
/// is removed and an existing destination is left as it was.
pub fn write_atomically<T>(
    destination: &Path,
    write: impl FnOnce(&mut File) -> Result<T>,
) -> Result<T> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    let value = write(temp.as_file_mut())?;
    temp.as_file().sync_all()?;

    temp.persist(destination).map_err(|err| Error::Persist {
        path: destination.display().to_string(),
        source: err.error,
    })?;

    Ok(value)
}
