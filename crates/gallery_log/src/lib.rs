//! Gallery logging & crash reporting
//!
//! Structured logging to console and a daily rolling JSON file, plus a panic
//! hook that leaves a crash report behind.

mod panic_hook;
mod logging;

pub use panic_hook::init_panic_hook;
pub use logging::{init_logging, cleanup_old_logs, LogGuard};

use std::path::PathBuf;
use directories::ProjectDirs;

/// Get the application log directory
pub fn log_dir() -> PathBuf {
    ProjectDirs::from("com", "ImageGallery", "ImageGallery")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialize logging and the panic hook.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for the lifetime of the process.
pub fn init() -> anyhow::Result<LogGuard> {
    let guard = init_logging(&log_dir())?;
    init_panic_hook();
    Ok(guard)
}
