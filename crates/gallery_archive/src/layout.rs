//! Archive layout: `category/filename` entries and the `tags.json` sidecar

use crate::sanitize::sanitize_component;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sidecar entry at the archive root
pub const TAGS_MANIFEST: &str = "tags.json";

/// Extensions accepted on import unless configured otherwise
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// One `{name, tags}` row of `tags.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagManifestEntry {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Contents of `tags.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagManifest(pub Vec<TagManifestEntry>);

impl TagManifest {
    pub fn push(&mut self, name: &str, tags: &[String]) {
        self.0.push(TagManifestEntry {
            name: name.to_string(),
            tags: tags.to_vec(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Tags keyed by file name; a later row for the same name wins
    pub fn into_map(self) -> HashMap<String, Vec<String>> {
        self.0.into_iter().map(|e| (e.name, e.tags)).collect()
    }
}

/// Entry path for an image: `{category}/{name}`
pub fn entry_path(category: &str, name: &str) -> String {
    format!(
        "{}/{}",
        sanitize_component(category),
        name.replace(['/', '\\'], "_")
    )
}

/// Split an entry path into `(category, filename)`.
///
/// The first segment is the category and the last is the file name; a path
/// without a separator has no category.
pub fn split_entry_path(path: &str) -> (Option<String>, String) {
    let normalized = path.replace('\\', "/");
    let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        [] => (None, String::new()),
        [name] => (None, name.to_string()),
        [category, .., name] => (Some(category.to_string()), name.to_string()),
    }
}

/// Case-insensitive extension check against an allow-list
pub fn has_allowed_extension<S: AsRef<str>>(name: &str, allowed: &[S]) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => allowed
            .iter()
            .any(|a| a.as_ref().eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_path() {
        assert_eq!(entry_path("Lab", "x_DSC.jpg"), "Lab/x_DSC.jpg");
        assert_eq!(entry_path("A/B", "x.png"), "A／B/x.png");
    }

    #[test]
    fn test_split_entry_path() {
        assert_eq!(split_entry_path("Lab/x.jpg"), (Some("Lab".into()), "x.jpg".into()));
        assert_eq!(split_entry_path("x.jpg"), (None, "x.jpg".into()));
        assert_eq!(split_entry_path("Lab/sub/x.jpg"), (Some("Lab".into()), "x.jpg".into()));
        assert_eq!(split_entry_path("Lab\\x.jpg"), (Some("Lab".into()), "x.jpg".into()));
    }

    #[test]
    fn test_allowed_extension() {
        assert!(has_allowed_extension("a.PNG", DEFAULT_IMAGE_EXTENSIONS));
        assert!(!has_allowed_extension("a.txt", DEFAULT_IMAGE_EXTENSIONS));
        assert!(!has_allowed_extension("png", DEFAULT_IMAGE_EXTENSIONS));
        assert!(!has_allowed_extension(".png", DEFAULT_IMAGE_EXTENSIONS));
    }

    #[test]
    fn test_manifest_json_shape() {
        let mut manifest = TagManifest::default();
        manifest.push("x.jpg", &["PBT".to_string()]);

        let value: serde_json::Value = serde_json::from_slice(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(value, serde_json::json!([{"name": "x.jpg", "tags": ["PBT"]}]));
    }

    #[test]
    fn test_manifest_missing_tags_field() {
        let manifest = TagManifest::from_json(br#"[{"name": "a.png"}]"#).unwrap();
        assert_eq!(manifest.into_map()["a.png"], Vec::<String>::new());
    }
}
