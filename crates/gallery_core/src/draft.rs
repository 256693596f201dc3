//! Staging copy for detail edits

use gallery_db::ImageRecord;

/// Editable copy of an image's category and tags.
///
/// Nothing here touches the repository snapshot; dropping the draft cancels
/// the edit and `ImageRepository::save_detail` commits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailDraft {
    id: i64,
    category: Option<String>,
    tags: Vec<String>,
}

impl DetailDraft {
    pub fn from_record(record: &ImageRecord) -> Self {
        Self {
            id: record.id,
            category: record.category_name().map(str::to_string),
            tags: record.tags.clone(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Empty or whitespace-only means uncategorized
    pub fn set_category(&mut self, category: Option<&str>) {
        self.category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
    }

    /// Returns false for empty or already-present tags
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    /// Write the draft's fields onto a record
    pub fn apply_to(&self, record: &mut ImageRecord) {
        record.category = self.category.clone();
        record.tags = self.tags.clone();
    }

    /// Does the draft differ from `record`?
    pub fn is_dirty(&self, record: &ImageRecord) -> bool {
        record.category_name() != self.category() || record.tags != self.tags
    }
}
