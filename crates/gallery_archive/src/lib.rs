//! Image Gallery archive layer
//!
//! Converts between image payloads and their external representations:
//! - ZIP archives laid out as `category/filename` plus a `tags.json` sidecar
//! - `data:` URIs holding base64 image bytes
//! - Legacy (non UTF-8) archive entry names
//! - Clipboard (feature `clipboard`)

mod encoding;
mod sanitize;
mod datauri;
mod layout;
mod zip_codec;
#[cfg(feature = "clipboard")]
pub mod clipboard;

pub use encoding::{decode_bytes, detect_encoding, system_encoding_hint, EncodingHint};
pub use sanitize::{sanitize_component, is_valid_component};
pub use datauri::{DataUri, mime_for_extension, extension_for_mime};
pub use layout::{
    entry_path, split_entry_path, has_allowed_extension, TagManifest, TagManifestEntry,
    TAGS_MANIFEST, DEFAULT_IMAGE_EXTENSIONS,
};
pub use zip_codec::{ArchiveEntry, ArchiveReader, ArchiveWriter, Compression};

use thiserror::Error;

/// Archive and payload errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid tag manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Entry not found in archive: {0}")]
    EntryNotFound(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
