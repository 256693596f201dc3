//! Image Gallery Core Domain Logic
//!
//! This crate contains:
//! - Image repository (store <-> memory snapshot)
//! - Filter & selection engine
//! - Category / tag directory
//! - Archive import & export
//! - The `Gallery` controller and its UI collaborator traits
//! - Configuration and error types

pub mod config;
pub mod error;
pub mod filter;
pub mod selection;
pub mod draft;
pub mod repository;
pub mod directory;
pub mod transfer;
pub mod sink;
pub mod state;

pub use config::{GalleryConfig, StorageConfig, GallerySettings, TransferConfig, LogConfig};
pub use error::GalleryError;
pub use filter::{
    CategoryFilter, FilterState, ModeFilter, suffix_matches,
    ALL_LABEL, FALLBACK_CATEGORY,
};
pub use selection::Selection;
pub use draft::DetailDraft;
pub use repository::{ImageRepository, NewImage, SaveOutcome};
pub use transfer::{
    ExportOptions, ExportReport, ImportOptions, ImportPhase, ImportReport,
    export_archive, import_archive,
};
pub use sink::{Choice, ConfirmRequest, GallerySink, Notice, NoticeLevel, ViewSummary};
pub use state::{Gallery, PendingAction};

pub use gallery_db::{ImageRecord, ImageStore};

pub type Result<T> = std::result::Result<T, GalleryError>;
