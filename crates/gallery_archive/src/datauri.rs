//! `data:` URI codec for image payloads

use crate::{ArchiveError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Decoded `data:` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUri {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { mime: mime.into(), bytes }
    }

    /// Build from raw file bytes, choosing the mime type from the file extension
    pub fn from_file_bytes(file_name: &str, bytes: Vec<u8>) -> Self {
        let ext = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        Self::new(mime_for_extension(ext), bytes)
    }

    /// Parse a base64 `data:` URI
    pub fn parse(uri: &str) -> Result<Self> {
        let (mime, payload) = split(uri)?;
        let bytes = STANDARD.decode(payload)?;
        Ok(Self::new(mime, bytes))
    }

    /// Only the base64 payload segment, without decoding
    pub fn payload(uri: &str) -> Result<&str> {
        split(uri).map(|(_, payload)| payload)
    }

    /// Encode as `data:<mime>;base64,<payload>`
    pub fn to_uri(&self) -> String {
        format!("{}{}{},{}", SCHEME, self.mime, BASE64_MARKER, STANDARD.encode(&self.bytes))
    }
}

fn split(uri: &str) -> Result<(&str, &str)> {
    let rest = uri
        .strip_prefix(SCHEME)
        .ok_or_else(|| ArchiveError::InvalidDataUri("missing data: scheme".into()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ArchiveError::InvalidDataUri("missing payload separator".into()))?;

    let mime = header
        .strip_suffix(BASE64_MARKER)
        .ok_or_else(|| ArchiveError::InvalidDataUri(format!("not base64 encoded: {}", header)))?;

    // Parameters such as charset are irrelevant for images
    let mime = mime.split(';').next().unwrap_or("");
    let mime = if mime.is_empty() { "application/octet-stream" } else { mime };

    Ok((mime, payload.trim()))
}

/// Mime type for an image file extension
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Preferred file extension for a mime type
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime.to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/bmp" => Some("bmp"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "image/tiff" => Some("tiff"),
        "image/x-icon" => Some("ico"),
        _ => None,
    }
}
