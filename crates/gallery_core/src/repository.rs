//! Image repository: the in-memory snapshot and its store mirror

use crate::directory;
use crate::draft::DetailDraft;
use crate::{GalleryError, Result};
use gallery_db::{ImageRecord, ImageStore, NewRecord};

/// Image about to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub name: String,
    /// Category override; empty means "none" on insert and "keep" on overwrite
    pub category: Option<String>,
    /// `data:` URI
    pub data: String,
}

impl NewImage {
    pub fn new(name: impl Into<String>, category: Option<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category,
            data: data.into(),
        }
    }

    fn category_override(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Result of `ImageRepository::save`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted(i64),
    /// An image with this name exists; nothing was written
    Conflict(NewImage),
}

/// Display timestamp stored with each record
pub(crate) fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Authoritative snapshot of every record, reloaded after each mutation
pub struct ImageRepository {
    store: ImageStore,
    images: Vec<ImageRecord>,
    categories: Vec<String>,
}

impl ImageRepository {
    /// Repository with an empty snapshot; call `load` to populate it
    pub fn new(store: ImageStore) -> Self {
        Self {
            store,
            images: Vec::new(),
            categories: Vec::new(),
        }
    }

    pub fn open(store: ImageStore) -> Result<Self> {
        let mut repo = Self::new(store);
        repo.load()?;
        Ok(repo)
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    /// Replace the snapshot with the store contents
    pub fn load(&mut self) -> Result<()> {
        let images = self.store.get_all()?;
        let categories = self.store.list_categories()?;

        tracing::debug!(images = images.len(), categories = categories.len(), "Snapshot loaded");
        self.images = images;
        self.categories = categories;
        Ok(())
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn get(&self, id: i64) -> Option<&ImageRecord> {
        self.images.iter().find(|r| r.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ImageRecord> {
        self.images.iter().find(|r| r.name == name)
    }

    pub fn exists_by_name(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    /// Categories registered explicitly, with or without images
    pub fn registered_categories(&self) -> &[String] {
        &self.categories
    }

    /// Insert a new image unless the name is taken.
    ///
    /// A taken name returns `SaveOutcome::Conflict` without touching the
    /// store; the caller decides between `overwrite_existing` and skipping.
    pub fn save(&mut self, image: NewImage) -> Result<SaveOutcome> {
        if image.name.trim().is_empty() {
            return Err(GalleryError::validation("Image name cannot be empty"));
        }
        if let Some(category) = image.category_override() {
            directory::check_category_name(category)?;
        }

        if self.exists_by_name(&image.name) {
            tracing::debug!(name = %image.name, "Duplicate name, awaiting decision");
            return Ok(SaveOutcome::Conflict(image));
        }

        let id = self.insert_unloaded(&image)?;
        self.load()?;
        Ok(SaveOutcome::Inserted(id))
    }

    /// Replace the payload of the image with the same name.
    ///
    /// The category changes only when `image` carries a non-empty one; the
    /// date is always refreshed. Returns the number of records rewritten.
    pub fn overwrite_existing(&mut self, image: NewImage) -> Result<usize> {
        let changed = self.overwrite_unloaded(&image, false)?;
        self.load()?;
        Ok(changed)
    }

    pub(crate) fn insert_unloaded(&self, image: &NewImage) -> Result<i64> {
        let record = NewRecord {
            name: image.name.clone(),
            category: image.category_override().map(str::to_string),
            tags: Vec::new(),
            data: image.data.clone(),
            date: timestamp(),
        };

        let id = self.store.add(&record)?;
        tracing::info!(id, name = %record.name, "Image saved");
        Ok(id)
    }

    /// Rewrite the record named like `image`; `reset_tags` empties its tags
    pub(crate) fn overwrite_unloaded(&self, image: &NewImage, reset_tags: bool) -> Result<usize> {
        let category = image.category_override().map(str::to_string);
        let date = timestamp();

        let changed = self.store.iterate_and_mutate(
            |r| r.name == image.name,
            |r| {
                r.data = image.data.clone();
                if let Some(category) = &category {
                    r.category = Some(category.clone());
                }
                r.date = date.clone();
                if reset_tags {
                    r.tags.clear();
                }
            },
        )?;

        tracing::info!(name = %image.name, changed, "Image overwritten");
        Ok(changed)
    }

    /// Replace the tags of the image called `name`.
    ///
    /// Does not reload; batch callers reload once at the end.
    pub fn set_tags_by_name(&self, name: &str, tags: &[String]) -> Result<usize> {
        Ok(self
            .store
            .iterate_and_mutate(|r| r.name == name, |r| r.tags = tags.to_vec())?)
    }

    /// Start editing an image's category and tags
    pub fn begin_edit(&self, id: i64) -> Option<DetailDraft> {
        self.get(id).map(DetailDraft::from_record)
    }

    /// Commit a draft with a single `put`.
    ///
    /// The snapshot is reloaded only after the store accepted the write.
    pub fn save_detail(&mut self, draft: &DetailDraft) -> Result<()> {
        let mut record = self
            .get(draft.id())
            .cloned()
            .ok_or(GalleryError::ImageNotFound(draft.id()))?;

        if !draft.is_dirty(&record) {
            return Ok(());
        }
        if let Some(category) = draft.category() {
            if record.category_name() != Some(category) {
                directory::check_category_name(category)?;
            }
        }

        draft.apply_to(&mut record);
        self.store.put(&record)?;
        self.load()?;

        tracing::info!(id = record.id, "Image details saved");
        Ok(())
    }

    /// Delete images by id. Returns how many existed.
    pub fn delete_images(&mut self, ids: &[i64]) -> Result<usize> {
        let mut deleted = 0;
        for id in ids {
            if self.store.delete(*id)? {
                deleted += 1;
            }
        }

        self.load()?;
        tracing::info!(deleted, "Images deleted");
        Ok(deleted)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn open_repo() -> (TempDir, ImageRepository) {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::open(&temp_dir.path().join("gallery.db")).unwrap();
        (temp_dir, ImageRepository::open(store).unwrap())
    }

    pub(crate) fn png(name: &str, category: Option<&str>) -> NewImage {
        NewImage::new(name, category.map(str::to_string), "data:image/png;base64,iVBORw0K")
    }

    #[test]
    fn test_snapshot_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::open(&temp_dir.path().join("gallery.db")).unwrap();
        store
            .add(&NewRecord {
                name: "a.png".into(),
                category: None,
                tags: vec![],
                data: String::new(),
                date: String::new(),
            })
            .unwrap();

        let mut repo = ImageRepository::new(store);
        assert!(repo.images().is_empty());
        repo.load().unwrap();
        assert_eq!(repo.images().len(), 1);
    }

    #[test]
    fn test_save_inserts_with_empty_tags() {
        let (_dir, mut repo) = open_repo();

        let outcome = repo.save(png("a.png", Some("Lab"))).unwrap();
        let SaveOutcome::Inserted(id) = outcome else {
            panic!("expected insert, got {:?}", outcome);
        };

        let record = repo.get(id).unwrap();
        assert_eq!(record.category.as_deref(), Some("Lab"));
        assert!(record.tags.is_empty());
        assert!(!record.date.is_empty());
    }

    #[test]
    fn test_save_conflict_writes_nothing() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("dup.png", None)).unwrap();
        let before = repo.store().get_all().unwrap();

        let outcome = repo.save(png("dup.png", Some("Lab"))).unwrap();
        assert!(matches!(outcome, SaveOutcome::Conflict(ref img) if img.name == "dup.png"));
        assert_eq!(repo.store().get_all().unwrap(), before);
    }

    #[test]
    fn test_save_rejects_empty_name() {
        let (_dir, mut repo) = open_repo();
        assert!(matches!(repo.save(png("  ", None)), Err(GalleryError::Validation(_))));
    }

    #[test]
    fn test_overwrite_keeps_category_without_override() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", Some("Lab"))).unwrap();
        let id = repo.find_by_name("a.png").unwrap().id;

        let changed = repo
            .overwrite_existing(NewImage::new("a.png", Some(String::new()), "data:image/png;base64,AAAA"))
            .unwrap();
        assert_eq!(changed, 1);

        let record = repo.get(id).unwrap();
        assert_eq!(record.data, "data:image/png;base64,AAAA");
        assert_eq!(record.category.as_deref(), Some("Lab"));
    }

    #[test]
    fn test_overwrite_applies_category_override() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", Some("Lab"))).unwrap();

        repo.overwrite_existing(png("a.png", Some("Field"))).unwrap();
        assert_eq!(repo.find_by_name("a.png").unwrap().category.as_deref(), Some("Field"));
        assert_eq!(repo.images().len(), 1);
    }

    #[test]
    fn test_overwrite_existing_keeps_tags() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", None)).unwrap();
        repo.set_tags_by_name("a.png", &["PBT".to_string()]).unwrap();

        repo.overwrite_existing(png("a.png", None)).unwrap();
        assert_eq!(repo.find_by_name("a.png").unwrap().tags, vec!["PBT"]);
    }

    #[test]
    fn test_overwrite_missing_name_changes_nothing() {
        let (_dir, mut repo) = open_repo();
        assert_eq!(repo.overwrite_existing(png("gone.png", None)).unwrap(), 0);
        assert!(repo.images().is_empty());
    }

    #[test]
    fn test_save_rejects_unsafe_category() {
        let (_dir, mut repo) = open_repo();
        let result = repo.save(png("a.png", Some("PBT/PET")));
        assert!(matches!(result, Err(GalleryError::Validation(_))));
        assert!(repo.store().get_all().unwrap().is_empty());
    }

    #[test]
    fn test_save_detail_rejects_unsafe_category() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", Some("Lab"))).unwrap();
        let id = repo.find_by_name("a.png").unwrap().id;

        let mut draft = repo.begin_edit(id).unwrap();
        draft.set_category(Some("a:b"));
        assert!(matches!(repo.save_detail(&draft), Err(GalleryError::Validation(_))));
        assert_eq!(repo.get(id).unwrap().category.as_deref(), Some("Lab"));
    }

    #[test]
    fn test_abandoned_draft_does_not_leak() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", None)).unwrap();
        let id = repo.find_by_name("a.png").unwrap().id;

        let mut draft = repo.begin_edit(id).unwrap();
        draft.add_tag("PBT");
        drop(draft);

        assert!(repo.get(id).unwrap().tags.is_empty());
    }

    #[test]
    fn test_save_detail() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", None)).unwrap();
        let id = repo.find_by_name("a.png").unwrap().id;

        let mut draft = repo.begin_edit(id).unwrap();
        draft.add_tag("PBT");
        draft.set_category(Some("Lab"));
        repo.save_detail(&draft).unwrap();

        let record = repo.get(id).unwrap();
        assert_eq!(record.tags, vec!["PBT".to_string()]);
        assert_eq!(record.category.as_deref(), Some("Lab"));
        assert_eq!(repo.store().get(id).unwrap().unwrap(), *record);
    }

    #[test]
    fn test_save_detail_for_deleted_image() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", None)).unwrap();
        let id = repo.find_by_name("a.png").unwrap().id;
        let mut draft = repo.begin_edit(id).unwrap();
        draft.add_tag("x");

        repo.delete_images(&[id]).unwrap();
        assert!(matches!(repo.save_detail(&draft), Err(GalleryError::ImageNotFound(_))));
    }

    #[test]
    fn test_delete_images() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", None)).unwrap();
        repo.save(png("b.png", None)).unwrap();
        let a = repo.find_by_name("a.png").unwrap().id;

        assert_eq!(repo.delete_images(&[a, 9999]).unwrap(), 1);
        assert_eq!(repo.images().len(), 1);
        assert!(!repo.exists_by_name("a.png"));
    }
}
