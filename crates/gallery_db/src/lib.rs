//! Image Gallery Database Layer
//!
//! SQLite-backed record store for image records and registered categories.

mod store;
mod schema;
mod pool;

pub use store::{ImageStore, ImageRecord, NewRecord};
pub use pool::{DbPool, init_pool};
pub use schema::{migrate, SCHEMA_VERSION};

use std::path::PathBuf;
use directories::ProjectDirs;
use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Get the database directory
pub fn db_dir() -> PathBuf {
    ProjectDirs::from("com", "ImageGallery", "ImageGallery")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Default location of the gallery database file
pub fn default_db_path() -> PathBuf {
    db_dir().join("gallery.db")
}
