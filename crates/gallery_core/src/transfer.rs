//! Bulk ZIP export and import
//!
//! Export groups records into `category/filename` entries plus an optional
//! root `tags.json`. Import runs in two passes: entries are committed one by
//! one, then sidecar tags are applied to the names imported in this run.

use crate::config::TransferConfig;
use crate::filter::FALLBACK_CATEGORY;
use crate::repository::{ImageRepository, NewImage};
use crate::Result;
use gallery_archive::{
    entry_path, extension_for_mime, has_allowed_extension, is_valid_component, split_entry_path,
    system_encoding_hint, ArchiveReader, ArchiveWriter, Compression, DataUri, EncodingHint,
    TagManifest, TAGS_MANIFEST,
};
use gallery_db::ImageRecord;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::{Read, Seek, Write};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Write `tags.json` when any exported image has tags
    pub include_tags: bool,
    pub compression: Compression,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_tags: true,
            compression: Compression::Deflate,
        }
    }
}

impl From<&TransferConfig> for ExportOptions {
    fn from(config: &TransferConfig) -> Self {
        Self {
            include_tags: config.include_tags,
            compression: config.compression,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub exported: usize,
    /// Rows written to `tags.json`
    pub tagged: usize,
    /// Records whose payload could not be decoded
    pub skipped: usize,
}

/// Write `records` as a ZIP archive into `writer`.
///
/// Returns the writer once the central directory is written.
pub fn export_archive<'a, W, I>(
    records: I,
    writer: W,
    options: &ExportOptions,
) -> Result<(W, ExportReport)>
where
    W: Write + Seek,
    I: IntoIterator<Item = &'a ImageRecord>,
{
    let mut groups: BTreeMap<&str, Vec<&ImageRecord>> = BTreeMap::new();
    for record in records {
        let category = record.category_name().unwrap_or(FALLBACK_CATEGORY);
        groups.entry(category).or_default().push(record);
    }

    let mut archive = ArchiveWriter::new(writer, options.compression);
    let mut manifest = TagManifest::default();
    let mut written = HashSet::new();
    let mut report = ExportReport::default();

    for (category, records) in groups {
        if !is_valid_component(category) {
            tracing::warn!(category, "Category folder name sanitized in archive");
        }

        for record in records {
            let payload = match DataUri::parse(&record.data) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(id = record.id, name = %record.name, "Skipping export: {}", e);
                    report.skipped += 1;
                    continue;
                }
            };

            let file_name = file_name_for(&record.name, &payload.mime);
            let path = entry_path(category, &file_name);
            if !written.insert(path.clone()) {
                tracing::warn!(path = %path, "Skipping export: entry already written");
                report.skipped += 1;
                continue;
            }

            archive.add_file(&path, &payload.bytes)?;
            report.exported += 1;

            if !record.tags.is_empty() {
                manifest.push(&file_name, &record.tags);
            }
        }
    }

    if options.include_tags && !manifest.is_empty() {
        archive.add_file(TAGS_MANIFEST, &manifest.to_json()?)?;
        report.tagged = manifest.0.len();
    }

    let writer = archive.finish()?;
    tracing::info!(
        exported = report.exported,
        tagged = report.tagged,
        skipped = report.skipped,
        "Export finished"
    );
    Ok((writer, report))
}

/// Name as stored in the archive; extensionless names get one from the mime type
fn file_name_for(name: &str, mime: &str) -> String {
    let has_extension = matches!(name.rsplit_once('.'), Some((stem, ext)) if !stem.is_empty() && !ext.is_empty());
    match extension_for_mime(mime) {
        Some(ext) if !has_extension => format!("{}.{}", name, ext),
        _ => name.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Replace existing images of the same name instead of skipping them
    pub overwrite: bool,
    pub allowed_extensions: Vec<String>,
    /// Code page guess for entry names without the UTF-8 flag
    pub encoding_hint: EncodingHint,
}

impl From<&TransferConfig> for ImportOptions {
    fn from(config: &TransferConfig) -> Self {
        Self {
            overwrite: config.overwrite_on_import,
            allowed_extensions: config.allowed_extensions.clone(),
            encoding_hint: system_encoding_hint(),
        }
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::from(&TransferConfig::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// File entries seen, `tags.json` excluded
    pub total: usize,
    /// New images inserted
    pub imported: usize,
    /// Existing images replaced
    pub overwritten: usize,
    pub skipped: usize,
    /// Images whose tags were set from `tags.json`
    pub tagged: usize,
}

impl ImportReport {
    pub fn committed(&self) -> usize {
        self.imported + self.overwritten
    }
}

/// Import progress, reported through tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    Idle,
    ReadingArchive,
    Classify,
    CommitStaged,
    ApplyPendingTags,
    Done,
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportPhase::Idle => "idle",
            ImportPhase::ReadingArchive => "reading-archive",
            ImportPhase::Classify => "classify",
            ImportPhase::CommitStaged => "commit-staged",
            ImportPhase::ApplyPendingTags => "apply-pending-tags",
            ImportPhase::Done => "done",
        };
        f.write_str(name)
    }
}

struct Importer<'r> {
    repo: &'r mut ImageRepository,
    options: &'r ImportOptions,
    phase: ImportPhase,
    report: ImportReport,
    /// Names committed in this run, in archive order
    committed: Vec<String>,
}

impl<'r> Importer<'r> {
    fn enter(&mut self, phase: ImportPhase) {
        tracing::debug!(from = %self.phase, to = %phase, "Import phase");
        self.phase = phase;
    }

    /// First pass: classify each entry and commit the accepted ones
    fn commit_entries<R: Read + Seek>(&mut self, archive: &mut ArchiveReader<R>) -> Result<()> {
        let entries: Vec<_> = archive
            .entries()
            .iter()
            .filter(|e| !e.is_dir && e.path != TAGS_MANIFEST)
            .cloned()
            .collect();

        let mut seen = HashSet::new();

        for entry in entries {
            self.enter(ImportPhase::Classify);
            self.report.total += 1;

            let (category, name) = split_entry_path(&entry.path);
            if !has_allowed_extension(&name, &self.options.allowed_extensions) {
                tracing::debug!(path = %entry.path, "Skipping entry: extension not allowed");
                self.report.skipped += 1;
                continue;
            }

            // First entry wins within one archive
            if !seen.insert(name.clone()) {
                tracing::warn!(path = %entry.path, "Skipping entry: duplicate name in archive");
                self.report.skipped += 1;
                continue;
            }

            let exists = self.repo.exists_by_name(&name);
            if exists && !self.options.overwrite {
                tracing::debug!(name = %name, "Skipping entry: name already in gallery");
                self.report.skipped += 1;
                continue;
            }

            self.enter(ImportPhase::CommitStaged);
            let bytes = archive.read(entry.index)?;
            let category = category.filter(|c| c != FALLBACK_CATEGORY);
            let image = NewImage::new(name.clone(), category, DataUri::from_file_bytes(&name, bytes).to_uri());

            // An imported entry starts untagged; the sidecar pass adds tags back
            if exists {
                self.repo.overwrite_unloaded(&image, true)?;
                self.report.overwritten += 1;
            } else {
                self.repo.insert_unloaded(&image)?;
                self.report.imported += 1;
            }
            self.committed.push(name);
        }

        Ok(())
    }

    /// Second pass: tags from the sidecar, for names committed in this run
    fn apply_tags(&mut self, manifest: TagManifest) -> Result<()> {
        self.enter(ImportPhase::ApplyPendingTags);
        let tags = manifest.into_map();

        for name in &self.committed {
            if let Some(tags) = tags.get(name) {
                if self.repo.set_tags_by_name(name, tags)? > 0 {
                    self.report.tagged += 1;
                }
            }
        }

        self.repo.load()
    }
}

/// Import a ZIP archive into the repository.
///
/// Names already in the gallery are skipped unless `options.overwrite` is
/// set. A failure midway leaves earlier entries committed and the snapshot
/// reloaded.
pub fn import_archive<R: Read + Seek>(
    repo: &mut ImageRepository,
    reader: R,
    options: &ImportOptions,
) -> Result<ImportReport> {
    let mut importer = Importer {
        repo,
        options,
        phase: ImportPhase::Idle,
        report: ImportReport::default(),
        committed: Vec::new(),
    };

    importer.enter(ImportPhase::ReadingArchive);
    let mut archive = ArchiveReader::new(reader, options.encoding_hint)?;
    let manifest = read_manifest(&mut archive);

    let outcome = importer.commit_entries(&mut archive);
    importer.repo.load()?;
    outcome?;

    if let Some(manifest) = manifest {
        importer.apply_tags(manifest)?;
    }

    importer.enter(ImportPhase::Done);
    let report = importer.report;
    tracing::info!(
        total = report.total,
        imported = report.imported,
        overwritten = report.overwritten,
        skipped = report.skipped,
        tagged = report.tagged,
        "Import finished"
    );
    Ok(report)
}

/// `tags.json` if present and well-formed
fn read_manifest<R: Read + Seek>(archive: &mut ArchiveReader<R>) -> Option<TagManifest> {
    if !archive.entries().iter().any(|e| e.path == TAGS_MANIFEST) {
        return None;
    }

    match archive.read_path(TAGS_MANIFEST).and_then(|bytes| TagManifest::from_json(&bytes)) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            tracing::warn!("Ignoring {}: {}", TAGS_MANIFEST, e);
            None
        }
    }
}
