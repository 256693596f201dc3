//! Visible-set derivation: category, tag-set and name-suffix mode filters

use gallery_db::ImageRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Display label for uncategorized images. Never needs to be persisted.
pub const FALLBACK_CATEGORY: &str = "其他";

/// Label of the "every category" pseudo-entry
pub const ALL_LABEL: &str = "全部";

/// Category dimension of the filter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

impl CategoryFilter {
    /// Parse a UI label; `all`, `全部` and empty mean no constraint
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label == ALL_LABEL || label.eq_ignore_ascii_case("all") {
            CategoryFilter::All
        } else {
            CategoryFilter::Named(label.to_string())
        }
    }

    pub fn matches(&self, record: &ImageRecord) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Named(name) if name == FALLBACK_CATEGORY => matches!(
                record.category.as_deref(),
                None | Some("") | Some(FALLBACK_CATEGORY)
            ),
            CategoryFilter::Named(name) => record.category.as_deref() == Some(name.as_str()),
        }
    }

    pub fn is_named(&self, category: &str) -> bool {
        matches!(self, CategoryFilter::Named(name) if name == category)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str(ALL_LABEL),
            CategoryFilter::Named(name) => f.write_str(name),
        }
    }
}

/// Name-suffix bucket. Cycles `DSC -> TGA -> ALL -> DSC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModeFilter {
    #[serde(rename = "DSC")]
    Dsc,
    #[serde(rename = "TGA")]
    Tga,
    #[default]
    #[serde(rename = "ALL")]
    All,
}

impl ModeFilter {
    /// Next mode in the toggle cycle
    pub fn next(self) -> Self {
        match self {
            ModeFilter::Dsc => ModeFilter::Tga,
            ModeFilter::Tga => ModeFilter::All,
            ModeFilter::All => ModeFilter::Dsc,
        }
    }

    pub fn suffix(self) -> Option<&'static str> {
        match self {
            ModeFilter::Dsc => Some("DSC"),
            ModeFilter::Tga => Some("TGA"),
            ModeFilter::All => None,
        }
    }

    pub fn label(self) -> &'static str {
        self.suffix().unwrap_or("ALL")
    }

    pub fn matches(self, name: &str) -> bool {
        match self.suffix() {
            Some(suffix) => suffix_matches(name, suffix),
            None => true,
        }
    }
}

impl fmt::Display for ModeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ModeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DSC" => Ok(ModeFilter::Dsc),
            "TGA" => Ok(ModeFilter::Tga),
            "ALL" => Ok(ModeFilter::All),
            other => Err(format!("unknown mode: {} (expected DSC, TGA or ALL)", other)),
        }
    }
}

/// Does the file stem (last extension stripped) end with `suffix`, ignoring case?
///
/// A naming convention, not a file-type check: `photo_DSC.jpg` matches `DSC`.
pub fn suffix_matches(name: &str, suffix: &str) -> bool {
    let stem = match name.rfind('.') {
        Some(pos) => &name[..pos],
        None => name,
    };
    stem.to_uppercase().ends_with(&suffix.to_uppercase())
}

/// The three composable filter dimensions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub category: CategoryFilter,
    /// AND semantics: a record must carry every tag
    pub tags: BTreeSet<String>,
    pub mode: ModeFilter,
}

impl FilterState {
    pub fn new(mode: ModeFilter) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &ImageRecord) -> bool {
        self.category.matches(record)
            && self.tags.iter().all(|tag| record.has_tag(tag))
            && self.mode.matches(&record.name)
    }

    /// Records passing every active dimension, in snapshot order
    pub fn visible<'a>(&self, images: &'a [ImageRecord]) -> Vec<&'a ImageRecord> {
        images.iter().filter(|r| self.matches(r)).collect()
    }

    pub fn visible_ids(&self, images: &[ImageRecord]) -> Vec<i64> {
        images.iter().filter(|r| self.matches(r)).map(|r| r.id).collect()
    }

    pub fn toggle_mode(&mut self) -> ModeFilter {
        self.mode = self.mode.next();
        self.mode
    }

    /// Returns false if the tag was already active
    pub fn add_tag(&mut self, tag: &str) -> bool {
        self.tags.insert(tag.to_string())
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    pub fn clear_tags(&mut self) {
        self.tags.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: i64, name: &str, category: Option<&str>, tags: &[&str]) -> ImageRecord {
        ImageRecord {
            id,
            name: name.to_string(),
            category: category.map(str::to_string),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            data: String::new(),
            date: String::new(),
        }
    }

    #[test]
    fn test_suffix_matches() {
        assert!(suffix_matches("photo_DSC.jpg", "DSC"));
        assert!(suffix_matches("photo_dsc.PNG", "DSC"));
        assert!(suffix_matches("sample-tga", "tga"));
        assert!(!suffix_matches("DSC_photo.jpg", "DSC"));
        // only the last extension is stripped
        assert!(!suffix_matches("a_DSC.tar.gz", "DSC"));
    }

    #[test]
    fn test_mode_cycle() {
        let mut mode = ModeFilter::Dsc;
        let mut seen = Vec::new();
        for _ in 0..3 {
            mode = mode.next();
            seen.push(mode);
        }
        assert_eq!(seen, vec![ModeFilter::Tga, ModeFilter::All, ModeFilter::Dsc]);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("dsc".parse::<ModeFilter>().unwrap(), ModeFilter::Dsc);
        assert_eq!(" ALL ".parse::<ModeFilter>().unwrap(), ModeFilter::All);
        assert!("xrd".parse::<ModeFilter>().is_err());
    }

    #[test]
    fn test_category_from_label() {
        assert_eq!(CategoryFilter::from_label("全部"), CategoryFilter::All);
        assert_eq!(CategoryFilter::from_label("all"), CategoryFilter::All);
        assert_eq!(CategoryFilter::from_label("Lab"), CategoryFilter::Named("Lab".into()));
    }

    #[test]
    fn test_fallback_category_matches_uncategorized() {
        let filter = CategoryFilter::Named(FALLBACK_CATEGORY.into());
        assert!(filter.matches(&image(1, "a.png", None, &[])));
        assert!(filter.matches(&image(2, "b.png", Some(""), &[])));
        assert!(filter.matches(&image(3, "c.png", Some(FALLBACK_CATEGORY), &[])));
        assert!(!filter.matches(&image(4, "d.png", Some("Lab"), &[])));
    }

    #[test]
    fn test_tags_are_and_semantics() {
        let images = vec![
            image(1, "a.png", None, &["PBT", "PET"]),
            image(2, "b.png", None, &["PBT"]),
        ];
        let mut filters = FilterState::default();
        filters.add_tag("PBT");
        filters.add_tag("PET");

        assert_eq!(filters.visible_ids(&images), vec![1]);
    }

    #[test]
    fn test_lab_scenario() {
        let images = vec![
            image(1, "x_DSC.jpg", Some("Lab"), &["PBT"]),
            image(2, "y_DSC.jpg", Some("Field"), &["PBT"]),
        ];
        let mut filters = FilterState::new(ModeFilter::Dsc);
        filters.category = CategoryFilter::Named("Lab".into());
        filters.add_tag("PBT");

        let visible: Vec<&str> = filters.visible(&images).into_iter().map(|r| r.name.as_str()).collect();
        assert_eq!(visible, vec!["x_DSC.jpg"]);

        filters.mode = ModeFilter::Tga;
        assert!(filters.visible(&images).is_empty());
    }
}
