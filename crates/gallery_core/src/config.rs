//! Application configuration

use crate::filter::ModeFilter;
use directories::ProjectDirs;
use gallery_archive::{Compression, DEFAULT_IMAGE_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub storage: StorageConfig,
    pub gallery: GallerySettings,
    pub transfer: TransferConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file; the platform data directory when unset
    pub db_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(gallery_db::default_db_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GallerySettings {
    /// Mode filter at startup
    pub default_mode: ModeFilter,
    /// Tags listed first, in this order, ahead of the alphabetical rest.
    ///
    /// Empty by default, which lists every tag alphabetically.
    pub tag_priority: Vec<String>,
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            default_mode: ModeFilter::All,
            tag_priority: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Extensions accepted on import (case-insensitive)
    pub allowed_extensions: Vec<String>,
    /// Write `tags.json` on export
    pub include_tags: bool,
    /// Replace existing images of the same name on import
    pub overwrite_on_import: bool,
    pub compression: Compression,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            include_tags: true,
            overwrite_on_import: false,
            compression: Compression::Deflate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub retention_days: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { retention_days: 7 }
    }
}

impl GalleryConfig {
    /// Load configuration from the default location
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it is missing
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!("Configuration loaded from {:?}", path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::info!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "ImageGallery", "ImageGallery")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }
}
