//! Clipboard output for images and text

use crate::{ArchiveError, DataUri, Result};
use arboard::{Clipboard, ImageData};
use parking_lot::Mutex;
use std::borrow::Cow;

/// Lazily-initialized system clipboard
pub struct ClipboardWriter {
    clipboard: Mutex<Option<Clipboard>>,
}

impl ClipboardWriter {
    pub fn new() -> Self {
        Self {
            clipboard: Mutex::new(None),
        }
    }

    fn with_clipboard<T>(&self, f: impl FnOnce(&mut Clipboard) -> Result<T>) -> Result<T> {
        let mut guard = self.clipboard.lock();
        if guard.is_none() {
            *guard = Some(Clipboard::new().map_err(|e| ArchiveError::Clipboard(e.to_string()))?);
        }
        match guard.as_mut() {
            Some(clipboard) => f(clipboard),
            None => Err(ArchiveError::Clipboard("clipboard unavailable".into())),
        }
    }

    /// Decode an image `data:` URI and place its pixels on the clipboard
    pub fn copy_image(&self, data_uri: &str) -> Result<()> {
        let payload = DataUri::parse(data_uri)?;
        let rgba = image::load_from_memory(&payload.bytes)
            .map_err(|e| ArchiveError::Clipboard(format!("cannot decode image: {}", e)))?
            .to_rgba8();

        let (width, height) = rgba.dimensions();
        let data = ImageData {
            width: width as usize,
            height: height as usize,
            bytes: Cow::Owned(rgba.into_raw()),
        };

        self.with_clipboard(|clipboard| {
            clipboard
                .set_image(data)
                .map_err(|e| ArchiveError::Clipboard(e.to_string()))
        })?;

        tracing::debug!(width, height, "Image copied to clipboard");
        Ok(())
    }
}

impl Default for ClipboardWriter {
    fn default() -> Self {
        Self::new()
    }
}
