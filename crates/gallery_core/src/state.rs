//! Gallery controller: the application state and every user-facing operation

use crate::directory;
use crate::filter::{CategoryFilter, FilterState, ModeFilter};
use crate::repository::{ImageRepository, NewImage, SaveOutcome};
use crate::sink::{Choice, ConfirmRequest, GallerySink, Notice, ViewSummary};
use crate::transfer::{self, ExportOptions, ExportReport, ImportOptions, ImportReport};
use crate::{DetailDraft, GalleryConfig, GalleryError, Result, Selection};
use gallery_archive::DataUri;
use gallery_db::{ImageRecord, ImageStore};
use std::collections::HashSet;
use std::io::{Read, Seek, Write};
use std::path::Path;

/// Operation parked until the user answers a confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    OverwriteImage(NewImage),
    DeleteImages(Vec<i64>),
    DeleteCategory(String),
    DeleteTag(String),
}

/// Main application state
pub struct Gallery<S: GallerySink> {
    config: GalleryConfig,

    /// Store mirror and snapshot
    repo: ImageRepository,

    filters: FilterState,
    selection: Selection,

    /// At most one outstanding confirmation
    pending: Option<PendingAction>,

    sink: S,

    #[cfg(feature = "clipboard")]
    clipboard: gallery_archive::clipboard::ClipboardWriter,
}

impl<S: GallerySink> Gallery<S> {
    /// Open the configured database and load the snapshot
    pub fn open(config: GalleryConfig, sink: S) -> Result<Self> {
        let path = config.storage.db_path();
        let store = ImageStore::open(&path)
            .map_err(|e| GalleryError::Init(format!("cannot open {}: {}", path.display(), e)))?;

        Self::new(config, store, sink)
    }

    pub fn new(config: GalleryConfig, store: ImageStore, sink: S) -> Result<Self> {
        let repo = ImageRepository::open(store)?;
        let filters = FilterState::new(config.gallery.default_mode);

        tracing::info!(images = repo.images().len(), "Gallery opened");

        let mut gallery = Self {
            config,
            repo,
            filters,
            selection: Selection::new(),
            pending: None,
            sink,
            #[cfg(feature = "clipboard")]
            clipboard: gallery_archive::clipboard::ClipboardWriter::new(),
        };
        gallery.render();
        Ok(gallery)
    }

    // ===== Accessors =====

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    pub fn repository(&self) -> &ImageRepository {
        &self.repo
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Records passing the current filters, in snapshot order
    pub fn visible(&self) -> Vec<&ImageRecord> {
        self.filters.visible(self.repo.images())
    }

    pub fn visible_ids(&self) -> Vec<i64> {
        self.filters.visible_ids(self.repo.images())
    }

    /// Selected records among the visible ones
    pub fn selected_visible(&self) -> Vec<&ImageRecord> {
        self.repo
            .images()
            .iter()
            .filter(|r| self.filters.matches(r) && self.selection.contains(r.id))
            .collect()
    }

    pub fn categories(&self) -> Vec<String> {
        directory::list_categories(&self.repo)
    }

    pub fn tags(&self) -> Vec<String> {
        directory::list_tags(&self.repo, &self.config.gallery.tag_priority)
    }

    pub fn view(&self) -> ViewSummary {
        let visible = self.visible_ids();
        ViewSummary {
            selected_visible: self.selection.selected_visible(&visible),
            fully_selected: self.selection.is_fully_selected(&visible),
            visible,
            category: self.filters.category.clone(),
            tags: self.filters.tags.iter().cloned().collect(),
            mode: self.filters.mode,
            categories: self.categories(),
        }
    }

    fn render(&mut self) {
        let view = self.view();
        self.sink.render(&view);
    }

    /// Log and surface a failed operation, then hand the error back
    fn report<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            match e {
                GalleryError::Validation(_) => tracing::warn!("{}", e),
                _ => tracing::error!("{}", e),
            }
            self.sink.notify(Notice::error(e.user_message()));
        }
        result
    }

    fn request(&mut self, action: PendingAction, request: ConfirmRequest) {
        if let Some(previous) = self.pending.replace(action) {
            tracing::debug!(?previous, "Unanswered confirmation replaced");
        }
        self.sink.request_confirmation(&request);
    }

    /// Re-read everything from the store
    pub fn reload(&mut self) -> Result<()> {
        let result = self.repo.load();
        self.report(result)?;

        let existing: HashSet<i64> = self.repo.images().iter().map(|r| r.id).collect();
        self.selection.retain_existing(&existing);
        self.render();
        Ok(())
    }

    // ===== Filters =====

    /// Accepts a UI label; `全部`/`all` clears the category filter
    pub fn set_category_filter(&mut self, label: &str) {
        self.filters.category = CategoryFilter::from_label(label);
        self.render();
    }

    pub fn add_tag_filter(&mut self, tag: &str) {
        if self.filters.add_tag(tag) {
            self.render();
        }
    }

    pub fn remove_tag_filter(&mut self, tag: &str) {
        if self.filters.remove_tag(tag) {
            self.render();
        }
    }

    pub fn clear_tag_filters(&mut self) {
        self.filters.clear_tags();
        self.render();
    }

    pub fn set_mode(&mut self, mode: ModeFilter) {
        self.filters.mode = mode;
        self.render();
    }

    /// Advance `DSC -> TGA -> ALL -> DSC`
    pub fn toggle_mode(&mut self) -> ModeFilter {
        let mode = self.filters.toggle_mode();
        self.render();
        mode
    }

    // ===== Selection =====

    pub fn toggle_selection(&mut self, id: i64) -> bool {
        let selected = self.selection.toggle(id);
        self.render();
        selected
    }

    pub fn select_all_visible(&mut self) {
        let visible = self.visible_ids();
        self.selection.select_all_visible(&visible);
        self.render();
    }

    /// Empties the whole selection, hidden ids included
    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.render();
    }

    pub fn toggle_select_all(&mut self) {
        let visible = self.visible_ids();
        self.selection.toggle_select_all(&visible);
        self.render();
    }

    // ===== Images =====

    /// Save a new image; a duplicate name asks whether to overwrite
    pub fn save_image(&mut self, image: NewImage) -> Result<SaveOutcome> {
        let result = self.repo.save(image);
        let outcome = self.report(result)?;

        match &outcome {
            SaveOutcome::Inserted(_) => {
                self.sink.notify(Notice::success("Image saved"));
                self.render();
            }
            SaveOutcome::Conflict(image) => {
                let request = ConfirmRequest::OverwriteImage { name: image.name.clone() };
                self.request(PendingAction::OverwriteImage(image.clone()), request);
            }
        }
        Ok(outcome)
    }

    /// Read an image file from disk and save it under its file name
    pub fn save_file(&mut self, path: &Path, category: Option<String>) -> Result<SaveOutcome> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => return self.report(Err(e.into())),
        };

        let data = DataUri::from_file_bytes(&name, bytes).to_uri();
        self.save_image(NewImage::new(name, category, data))
    }

    pub fn begin_edit(&self, id: i64) -> Option<DetailDraft> {
        self.repo.begin_edit(id)
    }

    pub fn commit_edit(&mut self, draft: &DetailDraft) -> Result<()> {
        let result = self.repo.save_detail(draft);
        self.report(result)?;

        self.sink.notify(Notice::success("Details saved"));
        self.render();
        Ok(())
    }

    /// Ask to delete the visible selected images. Returns how many are affected.
    pub fn request_delete_selected(&mut self) -> usize {
        let visible = self.visible_ids();
        let ids = self.selection.selected_visible(&visible);

        if ids.is_empty() {
            self.sink.notify(Notice::warning("No images selected"));
            return 0;
        }

        let count = ids.len();
        self.request(PendingAction::DeleteImages(ids), ConfirmRequest::DeleteImages { count });
        count
    }

    #[cfg(feature = "clipboard")]
    pub fn copy_to_clipboard(&mut self, id: i64) -> Result<()> {
        let result = match self.repo.get(id) {
            Some(record) => self.clipboard.copy_image(&record.data).map_err(GalleryError::from),
            None => Err(GalleryError::ImageNotFound(id)),
        };
        self.report(result)?;

        self.sink.notify(Notice::success("Image copied to clipboard"));
        Ok(())
    }

    // ===== Categories & tags =====

    pub fn add_category(&mut self, name: &str) -> Result<String> {
        let result = directory::add_category(&mut self.repo, name);
        let name = self.report(result)?;

        self.sink.notify(Notice::success(format!("Category \"{}\" added", name)));
        self.render();
        Ok(name)
    }

    /// Rename a category; an active filter on it follows the new name
    pub fn rename_category(&mut self, old: &str, new: &str) -> Result<usize> {
        let result = directory::rename_category(&mut self.repo, old, new);
        let changed = self.report(result)?;

        if self.filters.category.is_named(old) {
            self.filters.category = CategoryFilter::Named(new.trim().to_string());
        }

        self.sink.notify(Notice::success(format!("Category \"{}\" renamed", old)));
        self.render();
        Ok(changed)
    }

    pub fn request_delete_category(&mut self, name: &str) -> Result<()> {
        if directory::is_reserved(name) {
            let err = GalleryError::validation(format!("\"{}\" cannot be deleted", name));
            return self.report(Err(err));
        }

        let affected = directory::category_usage(&self.repo, name);
        self.request(
            PendingAction::DeleteCategory(name.to_string()),
            ConfirmRequest::DeleteCategory { name: name.to_string(), affected },
        );
        Ok(())
    }

    /// Rename a tag on every image; an active tag filter follows the new name
    pub fn rename_tag(&mut self, old: &str, new: &str) -> Result<usize> {
        let result = directory::rename_tag(&mut self.repo, old, new);
        let changed = self.report(result)?;

        if self.filters.remove_tag(old) {
            self.filters.add_tag(new.trim());
        }

        self.sink.notify(Notice::success(format!("Tag \"{}\" renamed", old)));
        self.render();
        Ok(changed)
    }

    pub fn request_delete_tag(&mut self, name: &str) {
        let affected = directory::tag_usage(&self.repo, name);
        self.request(
            PendingAction::DeleteTag(name.to_string()),
            ConfirmRequest::DeleteTag { name: name.to_string(), affected },
        );
    }

    // ===== Transfer =====

    /// Export the visible selected images as a ZIP archive
    pub fn export_selected<W: Write + Seek>(&mut self, writer: W) -> Result<(W, ExportReport)> {
        let records = self.selected_visible();
        let result = if records.is_empty() {
            Err(GalleryError::validation("No images selected"))
        } else {
            transfer::export_archive(records, writer, &ExportOptions::from(&self.config.transfer))
        };
        let (writer, report) = self.report(result)?;

        let notice = match report.skipped {
            0 => Notice::success(format!("Exported {} image(s)", report.exported)),
            skipped => Notice::warning(format!(
                "Exported {} image(s), {} could not be exported",
                report.exported, skipped
            )),
        };
        self.sink.notify(notice);
        Ok((writer, report))
    }

    /// Import with the configured options
    pub fn import<R: Read + Seek>(&mut self, reader: R) -> Result<ImportReport> {
        let options = ImportOptions::from(&self.config.transfer);
        self.import_with(reader, &options)
    }

    pub fn import_with<R: Read + Seek>(
        &mut self,
        reader: R,
        options: &ImportOptions,
    ) -> Result<ImportReport> {
        let result = transfer::import_archive(&mut self.repo, reader, options);
        let outcome = self.report(result);

        // Entries committed before a failure stay, so redraw either way
        self.render();
        let report = outcome?;

        let mut message = format!("Imported {} image(s)", report.committed());
        if report.skipped > 0 {
            message.push_str(&format!(", skipped {}", report.skipped));
        }
        self.sink.notify(Notice::success(message));
        Ok(report)
    }

    // ===== Confirmation =====

    /// Resume the parked operation with the user's answer
    pub fn resolve_confirmation(&mut self, choice: Choice) -> Result<()> {
        let Some(action) = self.pending.take() else {
            tracing::debug!("No confirmation pending");
            return Ok(());
        };

        if choice == Choice::Decline {
            let notice = match &action {
                PendingAction::OverwriteImage(image) => {
                    Notice::info(format!("Skipped \"{}\"", image.name))
                }
                _ => Notice::info("Cancelled"),
            };
            tracing::debug!(?action, "Confirmation declined");
            self.sink.notify(notice);
            return Ok(());
        }

        let result = self.execute(action);
        let notice = self.report(result)?;
        self.sink.notify(notice);
        self.render();
        Ok(())
    }

    /// Drop the parked operation without touching the store
    pub fn dismiss_confirmation(&mut self) {
        if let Some(action) = self.pending.take() {
            tracing::debug!(?action, "Confirmation dismissed");
        }
    }

    fn execute(&mut self, action: PendingAction) -> Result<Notice> {
        match action {
            PendingAction::OverwriteImage(image) => {
                let name = image.name.clone();
                if self.repo.overwrite_existing(image.clone())? > 0 {
                    return Ok(Notice::success(format!("\"{}\" overwritten", name)));
                }

                // Deleted while the confirmation was open; save it as new
                tracing::info!(name = %name, "Overwrite target gone, inserting");
                match self.repo.save(image)? {
                    SaveOutcome::Inserted(_) => Ok(Notice::success(format!("\"{}\" saved", name))),
                    SaveOutcome::Conflict(_) => Err(GalleryError::validation(format!(
                        "\"{}\" could not be saved",
                        name
                    ))),
                }
            }
            PendingAction::DeleteImages(ids) => {
                let deleted = self.repo.delete_images(&ids)?;
                self.selection.remove_all(&ids);
                Ok(Notice::success(format!("Deleted {} image(s)", deleted)))
            }
            PendingAction::DeleteCategory(name) => {
                directory::delete_category(&mut self.repo, &name)?;
                if self.filters.category.is_named(&name) {
                    self.filters.category = CategoryFilter::All;
                }
                Ok(Notice::success(format!("Category \"{}\" deleted", name)))
            }
            PendingAction::DeleteTag(name) => {
                directory::delete_tag(&mut self.repo, &name)?;
                self.filters.remove_tag(&name);
                Ok(Notice::success(format!("Tag \"{}\" deleted", name)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{NoticeLevel, RecordingSink};
    use tempfile::TempDir;

    fn open_gallery() -> (TempDir, Gallery<RecordingSink>) {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::open(&temp_dir.path().join("gallery.db")).unwrap();
        let gallery = Gallery::new(GalleryConfig::default(), store, RecordingSink::new()).unwrap();
        (temp_dir, gallery)
    }

    fn png(name: &str, category: Option<&str>) -> NewImage {
        NewImage::new(name, category.map(str::to_string), "data:image/png;base64,iVBORw0K")
    }

    #[test]
    fn test_renders_on_open() {
        let (_dir, gallery) = open_gallery();
        assert_eq!(gallery.sink().renders, 1);
        assert_eq!(gallery.filters().mode, ModeFilter::All);
    }

    #[test]
    fn test_overwrite_confirmed() {
        let (_dir, mut gallery) = open_gallery();
        gallery.save_image(png("dup.png", Some("Lab"))).unwrap();

        let outcome = gallery
            .save_image(NewImage::new("dup.png", None, "data:image/png;base64,AAAA"))
            .unwrap();
        assert!(matches!(outcome, SaveOutcome::Conflict(_)));
        assert_eq!(
            gallery.sink().requests.last(),
            Some(&ConfirmRequest::OverwriteImage { name: "dup.png".into() })
        );

        gallery.resolve_confirmation(Choice::Confirm).unwrap();
        let record = gallery.repository().find_by_name("dup.png").unwrap();
        assert_eq!(record.data, "data:image/png;base64,AAAA");
        assert_eq!(record.category.as_deref(), Some("Lab"));
        assert!(gallery.pending().is_none());
    }

    #[test]
    fn test_overwrite_target_deleted_before_confirm() {
        let (_dir, mut gallery) = open_gallery();
        gallery.save_image(png("dup.png", Some("Lab"))).unwrap();
        gallery
            .save_image(NewImage::new("dup.png", Some("Field".into()), "data:image/png;base64,AAAA"))
            .unwrap();

        let id = gallery.repository().find_by_name("dup.png").unwrap().id;
        gallery.repository().store().delete(id).unwrap();
        gallery.resolve_confirmation(Choice::Confirm).unwrap();

        let record = gallery.repository().find_by_name("dup.png").unwrap();
        assert_eq!(record.data, "data:image/png;base64,AAAA");
        assert_eq!(record.category.as_deref(), Some("Field"));
        assert_eq!(gallery.repository().store().get_all().unwrap().len(), 1);
        assert_eq!(gallery.sink().last_notice().unwrap().message, "\"dup.png\" saved");
    }

    #[test]
    fn test_new_request_replaces_pending() {
        let (_dir, mut gallery) = open_gallery();
        gallery.save_image(png("a.png", None)).unwrap();
        gallery.save_image(png("a.png", None)).unwrap();

        gallery.request_delete_tag("PBT");
        assert_eq!(gallery.pending(), Some(&PendingAction::DeleteTag("PBT".into())));
    }

    #[test]
    fn test_dismiss_leaves_store_untouched() {
        let (_dir, mut gallery) = open_gallery();
        gallery.save_image(png("a.png", None)).unwrap();
        gallery.select_all_visible();
        assert_eq!(gallery.request_delete_selected(), 1);

        gallery.dismiss_confirmation();
        gallery.resolve_confirmation(Choice::Confirm).unwrap();
        assert_eq!(gallery.repository().images().len(), 1);
    }

    #[test]
    fn test_delete_selected_only_visible() {
        let (_dir, mut gallery) = open_gallery();
        gallery.save_image(png("x_DSC.png", None)).unwrap();
        gallery.save_image(png("y_TGA.png", None)).unwrap();
        gallery.select_all_visible();

        gallery.set_mode(ModeFilter::Dsc);
        assert_eq!(gallery.request_delete_selected(), 1);
        gallery.resolve_confirmation(Choice::Confirm).unwrap();

        let names: Vec<&str> = gallery.repository().images().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["y_TGA.png"]);
        assert_eq!(gallery.selection().len(), 1);
    }

    #[test]
    fn test_delete_without_selection_warns() {
        let (_dir, mut gallery) = open_gallery();
        assert_eq!(gallery.request_delete_selected(), 0);
        assert!(gallery.pending().is_none());
        assert_eq!(gallery.sink().last_notice().unwrap().level, NoticeLevel::Warning);
    }

    #[test]
    fn test_category_filter_follows_rename_and_delete() {
        let (_dir, mut gallery) = open_gallery();
        gallery.save_image(png("a.png", Some("A"))).unwrap();
        gallery.set_category_filter("A");

        gallery.rename_category("A", "B").unwrap();
        assert_eq!(gallery.filters().category, CategoryFilter::Named("B".into()));
        assert_eq!(gallery.visible().len(), 1);

        gallery.request_delete_category("B").unwrap();
        gallery.resolve_confirmation(Choice::Confirm).unwrap();
        assert_eq!(gallery.filters().category, CategoryFilter::All);
        assert_eq!(gallery.repository().images()[0].category, None);
    }

    #[test]
    fn test_reserved_category_delete_rejected() {
        let (_dir, mut gallery) = open_gallery();
        assert!(gallery.request_delete_category("其他").is_err());
        assert!(gallery.pending().is_none());
        assert_eq!(gallery.sink().last_notice().unwrap().level, NoticeLevel::Error);
    }

    #[test]
    fn test_tag_filter_follows_rename() {
        let (_dir, mut gallery) = open_gallery();
        gallery.save_image(png("a.png", None)).unwrap();
        let id = gallery.repository().images()[0].id;

        let mut draft = gallery.begin_edit(id).unwrap();
        draft.add_tag("PBT");
        gallery.commit_edit(&draft).unwrap();
        gallery.add_tag_filter("PBT");

        gallery.rename_tag("PBT", "PET").unwrap();
        assert!(gallery.filters().tags.contains("PET"));
        assert_eq!(gallery.visible().len(), 1);
        assert_eq!(gallery.tags(), vec!["PET"]);
    }

    #[test]
    fn test_export_requires_selection() {
        let (_dir, mut gallery) = open_gallery();
        gallery.save_image(png("a.png", None)).unwrap();

        let result = gallery.export_selected(std::io::Cursor::new(Vec::new()));
        assert!(matches!(result, Err(GalleryError::Validation(_))));
    }

    #[test]
    fn test_reload_drops_missing_ids() {
        let (_dir, mut gallery) = open_gallery();
        gallery.save_image(png("a.png", None)).unwrap();
        gallery.select_all_visible();

        let id = gallery.repository().images()[0].id;
        gallery.repository().store().delete(id).unwrap();
        gallery.reload().unwrap();

        assert!(gallery.selection().is_empty());
        assert!(gallery.visible().is_empty());
    }
}
