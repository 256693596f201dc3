//! ZIP archive reading and writing

use crate::encoding::{self, EncodingHint};
use crate::{ArchiveError, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Entry in an archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Position in the central directory
    pub index: usize,

    /// Last path segment
    pub name: String,

    /// Full path within the archive, `/`-separated
    pub path: String,

    /// Uncompressed size in bytes
    pub size: u64,

    /// Is this a directory?
    pub is_dir: bool,
}

/// Compression used when writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compression {
    #[serde(rename = "stored")]
    Stored,
    #[default]
    #[serde(rename = "deflate")]
    Deflate,
}

impl Compression {
    fn method(self) -> CompressionMethod {
        match self {
            Compression::Stored => CompressionMethod::Stored,
            Compression::Deflate => CompressionMethod::Deflated,
        }
    }
}

/// Reader over a ZIP archive
pub struct ArchiveReader<R: Read + Seek> {
    archive: ZipArchive<R>,
    entries: Vec<ArchiveEntry>,
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Open an archive, decoding legacy entry names with `hint`
    pub fn new(reader: R, hint: EncodingHint) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let file = archive.by_index_raw(index)?;

            // Entry names without the UTF-8 flag are in whatever code page the packer used
            let (path, _) = encoding::decode_bytes(file.name_raw(), hint);
            let path = path.replace('\\', "/");

            entries.push(ArchiveEntry {
                index,
                name: path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(&path).to_string(),
                is_dir: file.is_dir() || path.ends_with('/'),
                path,
                size: file.size(),
            });
        }

        tracing::debug!("Archive opened with {} entries", entries.len());
        Ok(Self { archive, entries })
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Read an entry's bytes by index
    pub fn read(&mut self, index: usize) -> Result<Vec<u8>> {
        let mut file = self.archive.by_index(index)?;

        let mut buffer = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buffer)?;

        Ok(buffer)
    }

    /// Read an entry's bytes by path
    pub fn read_path(&mut self, path: &str) -> Result<Vec<u8>> {
        let index = self
            .entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.index)
            .ok_or_else(|| ArchiveError::EntryNotFound(path.to_string()))?;

        self.read(index)
    }
}

/// Writer producing a ZIP archive
pub struct ArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
    count: usize,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    pub fn new(writer: W, compression: Compression) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: SimpleFileOptions::default().compression_method(compression.method()),
            count: 0,
        }
    }

    /// Add a file entry
    pub fn add_file(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        self.zip.start_file(path, self.options)?;
        self.zip.write_all(bytes)?;
        self.count += 1;
        Ok(())
    }

    /// Number of entries written so far
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Write the central directory and hand back the underlying writer
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}
