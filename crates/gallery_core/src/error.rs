//! Gallery error types

use thiserror::Error;

/// Main gallery error type
#[derive(Error, Debug)]
pub enum GalleryError {
    // ===== Recoverable Errors (notify user, continue) =====
    #[error("Store error: {0}")]
    Store(#[from] gallery_db::DbError),

    #[error("Archive error: {0}")]
    Archive(#[from] gallery_archive::ArchiveError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Validation(String),

    #[error("Image not found: #{0}")]
    ImageNotFound(i64),

    // ===== Fatal Errors (cannot start) =====
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Init(String),
}

impl GalleryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        GalleryError::Validation(msg.into())
    }

    /// Is this error recoverable?
    pub fn is_recoverable(&self) -> bool {
        match self {
            GalleryError::Store(e) => !matches!(
                e,
                gallery_db::DbError::Migration(_) | gallery_db::DbError::Pool(_)
            ),
            GalleryError::Archive(_)
            | GalleryError::Io(_)
            | GalleryError::Validation(_)
            | GalleryError::ImageNotFound(_) => true,
            GalleryError::Config(_) | GalleryError::Init(_) => false,
        }
    }

    /// Is this a fatal error?
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            GalleryError::Validation(msg) => msg.clone(),
            GalleryError::ImageNotFound(_) => "The image no longer exists".to_string(),
            GalleryError::Archive(gallery_archive::ArchiveError::Zip(_)) => {
                "Import failed: the file is not a readable ZIP archive".to_string()
            }
            GalleryError::Archive(msg) => format!("Archive error: {}", msg),
            GalleryError::Store(_) => "Saving to the gallery database failed".to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(GalleryError::validation("empty name").is_recoverable());
        assert!(GalleryError::Store(gallery_db::DbError::NotFound("x".into())).is_recoverable());
        assert!(GalleryError::Store(gallery_db::DbError::Migration("x".into())).is_fatal());
        assert!(GalleryError::Config("bad toml".into()).is_fatal());
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = GalleryError::validation("Category name cannot be empty");
        assert_eq!(err.user_message(), "Category name cannot be empty");
    }
}
