//! UI collaborator surface
//!
//! The core never draws anything. After each state change it hands the
//! sink a `ViewSummary`; user-facing messages go through `notify` and
//! decisions through `request_confirmation`.

use crate::filter::{CategoryFilter, ModeFilter};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A decision the core is waiting on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmRequest {
    OverwriteImage { name: String },
    DeleteImages { count: usize },
    DeleteCategory { name: String, affected: usize },
    DeleteTag { name: String, affected: usize },
}

impl ConfirmRequest {
    /// Question shown to the user
    pub fn message(&self) -> String {
        match self {
            ConfirmRequest::OverwriteImage { name } => {
                format!("An image named \"{}\" already exists. Overwrite it?", name)
            }
            ConfirmRequest::DeleteImages { count } => {
                format!("Delete {} selected image(s)?", count)
            }
            ConfirmRequest::DeleteCategory { name, affected } => format!(
                "Delete category \"{}\"? {} image(s) will become uncategorized.",
                name, affected
            ),
            ConfirmRequest::DeleteTag { name, affected } => {
                format!("Remove tag \"{}\" from {} image(s)?", name, affected)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Confirm,
    Decline,
}

/// What the UI needs to redraw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSummary {
    /// Visible record ids, in snapshot order
    pub visible: Vec<i64>,
    /// `visible ∩ selected`
    pub selected_visible: Vec<i64>,
    pub fully_selected: bool,
    pub category: CategoryFilter,
    pub tags: Vec<String>,
    pub mode: ModeFilter,
    pub categories: Vec<String>,
}

impl ViewSummary {
    pub fn selected_count(&self) -> usize {
        self.selected_visible.len()
    }
}

/// Callbacks into the presentation layer
pub trait GallerySink {
    fn render(&mut self, view: &ViewSummary);

    fn notify(&mut self, notice: Notice);

    /// Ask the user; the answer comes back via `Gallery::resolve_confirmation`
    fn request_confirmation(&mut self, request: &ConfirmRequest);
}

/// Sink that records every call
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub renders: usize,
    pub last_view: Option<ViewSummary>,
    pub notices: Vec<Notice>,
    pub requests: Vec<ConfirmRequest>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.notices.last()
    }
}

#[cfg(test)]
impl GallerySink for RecordingSink {
    fn render(&mut self, view: &ViewSummary) {
        self.renders += 1;
        self.last_view = Some(view.clone());
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    fn request_confirmation(&mut self, request: &ConfirmRequest) {
        self.requests.push(request.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_messages() {
        let request = ConfirmRequest::DeleteCategory { name: "Lab".into(), affected: 3 };
        assert!(request.message().contains("\"Lab\""));
        assert!(request.message().contains('3'));

        let request = ConfirmRequest::OverwriteImage { name: "dup.png".into() };
        assert!(request.message().contains("dup.png"));
    }

    #[test]
    fn test_recording_sink() {
        let mut sink = RecordingSink::new();
        sink.notify(Notice::warning("careful"));
        sink.request_confirmation(&ConfirmRequest::DeleteImages { count: 2 });

        assert_eq!(sink.last_notice().unwrap().level, NoticeLevel::Warning);
        assert_eq!(sink.requests.len(), 1);
        assert_eq!(sink.renders, 0);
    }
}
