//! Image Gallery - command-line front end
//!
//! Every subcommand drives the same `Gallery` controller a graphical front
//! end would, with confirmations answered on the terminal.

mod terminal;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use gallery_core::{
    Choice, Gallery, GalleryConfig, GalleryError, ImportOptions, ModeFilter, SaveOutcome,
    ALL_LABEL, FALLBACK_CATEGORY,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use terminal::TerminalSink;

#[derive(Parser, Debug)]
#[command(name = "gallery", version, about = "Local image gallery with categories, tags and ZIP transfer")]
struct Cli {
    /// Database file (overrides the configured one)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Answer yes to every confirmation
    #[arg(long, short, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List images passing the filters
    List {
        #[arg(long)]
        category: Option<String>,
        /// Required tag (can be repeated; all must match)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// DSC, TGA or ALL
        #[arg(long)]
        mode: Option<ModeFilter>,
    },
    /// List categories
    Categories,
    /// List tags
    Tags,
    /// Add an image file
    Add {
        file: PathBuf,
        #[arg(long)]
        category: Option<String>,
        /// Replace an existing image of the same name without asking
        #[arg(long)]
        overwrite: bool,
    },
    /// Change an image's category or tags
    Edit {
        name: String,
        /// New category; empty clears it
        #[arg(long)]
        category: Option<String>,
        #[arg(long = "add-tag")]
        add_tags: Vec<String>,
        #[arg(long = "remove-tag")]
        remove_tags: Vec<String>,
    },
    /// Delete images by name
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
    AddCategory {
        name: String,
    },
    RenameCategory {
        old: String,
        new: String,
    },
    /// Delete a category; its images become uncategorized
    DeleteCategory {
        name: String,
    },
    RenameTag {
        old: String,
        new: String,
    },
    DeleteTag {
        name: String,
    },
    /// Export images to a ZIP archive
    Export {
        output: PathBuf,
        /// Only this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Import images from a ZIP archive
    Import {
        archive: PathBuf,
        /// Replace existing images of the same name
        #[arg(long)]
        overwrite: bool,
    },
    /// Copy an image to the clipboard
    #[cfg(feature = "clipboard")]
    Copy {
        name: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = match gallery_log::init() {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: logging disabled: {:#}", e);
            None
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Gallery errors have already been shown through the sink
            if e.downcast_ref::<GalleryError>().is_none() {
                eprintln!("error: {:#}", e);
            }
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => GalleryConfig::load_from(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => GalleryConfig::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load configuration: {}", e);
            GalleryConfig::default()
        }),
    };

    if let Err(e) = gallery_log::cleanup_old_logs(&gallery_log::log_dir(), config.log.retention_days) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    if let Some(db) = cli.db {
        config.storage.db_path = Some(db);
    }

    let mut gallery = Gallery::open(config, TerminalSink::new(cli.yes))
        .map_err(|e| anyhow!("Failed to open gallery: {}", e))?;

    match cli.command {
        Command::List { category, tags, mode } => {
            gallery.set_category_filter(category.as_deref().unwrap_or(ALL_LABEL));
            for tag in &tags {
                gallery.add_tag_filter(tag);
            }
            if let Some(mode) = mode {
                gallery.set_mode(mode);
            }
            print_list(&gallery);
        }
        Command::Categories => {
            for category in gallery.categories() {
                println!("{}", category);
            }
        }
        Command::Tags => {
            for tag in gallery.tags() {
                println!("{}", tag);
            }
        }
        Command::Add { file, category, overwrite } => {
            let outcome = gallery.save_file(&file, category)?;
            if matches!(outcome, SaveOutcome::Conflict(_)) && overwrite {
                gallery.sink_mut().take_request();
                gallery.resolve_confirmation(Choice::Confirm)?;
            } else {
                settle(&mut gallery)?;
            }
        }
        Command::Edit { name, category, add_tags, remove_tags } => {
            let id = find_id(&gallery, &name)?;
            let mut draft = gallery
                .begin_edit(id)
                .ok_or(GalleryError::ImageNotFound(id))?;

            if let Some(category) = category {
                draft.set_category(Some(&category));
            }
            for tag in &remove_tags {
                draft.remove_tag(tag);
            }
            for tag in &add_tags {
                draft.add_tag(tag);
            }
            gallery.commit_edit(&draft)?;
        }
        Command::Delete { names } => {
            let mut ids = names
                .iter()
                .map(|name| find_id(&gallery, name))
                .collect::<Result<Vec<_>>>()?;
            ids.sort_unstable();
            ids.dedup();

            gallery.set_category_filter(ALL_LABEL);
            gallery.clear_tag_filters();
            gallery.set_mode(ModeFilter::All);
            gallery.clear_selection();
            for id in ids {
                gallery.toggle_selection(id);
            }
            gallery.request_delete_selected();
            settle(&mut gallery)?;
        }
        Command::AddCategory { name } => {
            gallery.add_category(&name)?;
        }
        Command::RenameCategory { old, new } => {
            gallery.rename_category(&old, &new)?;
        }
        Command::DeleteCategory { name } => {
            gallery.request_delete_category(&name)?;
            settle(&mut gallery)?;
        }
        Command::RenameTag { old, new } => {
            gallery.rename_tag(&old, &new)?;
        }
        Command::DeleteTag { name } => {
            gallery.request_delete_tag(&name);
            settle(&mut gallery)?;
        }
        Command::Export { output, category } => {
            gallery.set_category_filter(category.as_deref().unwrap_or(ALL_LABEL));
            gallery.set_mode(ModeFilter::All);
            gallery.select_all_visible();

            let file = File::create(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let (mut writer, _) = gallery.export_selected(BufWriter::new(file))?;
            writer.flush()?;
        }
        Command::Import { archive, overwrite } => {
            let file = File::open(&archive)
                .with_context(|| format!("Failed to open {}", archive.display()))?;

            let mut options = ImportOptions::from(&gallery.config().transfer);
            options.overwrite |= overwrite;
            gallery.import_with(BufReader::new(file), &options)?;
        }
        #[cfg(feature = "clipboard")]
        Command::Copy { name } => {
            let id = find_id(&gallery, &name)?;
            gallery.copy_to_clipboard(id)?;
        }
    }

    Ok(())
}

/// Answer an outstanding confirmation and resume the parked operation
fn settle(gallery: &mut Gallery<TerminalSink>) -> Result<()> {
    if let Some(choice) = gallery.sink_mut().answer() {
        gallery.resolve_confirmation(choice)?;
    }
    Ok(())
}

fn find_id(gallery: &Gallery<TerminalSink>, name: &str) -> Result<i64> {
    match gallery.repository().find_by_name(name) {
        Some(record) => Ok(record.id),
        None => bail!("No image named \"{}\"", name),
    }
}

fn print_list(gallery: &Gallery<TerminalSink>) {
    let visible = gallery.visible();

    for record in &visible {
        println!(
            "{:>5}  {:<32}  {:<12}  {:<19}  {}",
            record.id,
            record.name,
            record.category_name().unwrap_or(FALLBACK_CATEGORY),
            record.date,
            record.tags.join(", ")
        );
    }

    let filters = gallery.filters();
    println!(
        "{} image(s) [category: {}, mode: {}]",
        visible.len(),
        filters.category,
        filters.mode
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from([
            "gallery", "list", "--category", "Lab", "--tag", "PBT", "--tag", "PET", "--mode", "dsc",
        ])
        .unwrap();

        match cli.command {
            Command::List { category, tags, mode } => {
                assert_eq!(category.as_deref(), Some("Lab"));
                assert_eq!(tags, vec!["PBT", "PET"]);
                assert_eq!(mode, Some(ModeFilter::Dsc));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["gallery", "import", "in.zip", "--overwrite", "--yes", "--db", "g.db"])
            .unwrap();

        assert!(cli.yes);
        assert_eq!(cli.db, Some(PathBuf::from("g.db")));
        assert!(matches!(cli.command, Command::Import { overwrite: true, .. }));
    }

    #[test]
    fn test_parse_rejects_bad_mode() {
        assert!(Cli::try_parse_from(["gallery", "list", "--mode", "xrd"]).is_err());
        assert!(Cli::try_parse_from(["gallery", "delete"]).is_err());
    }

    #[test]
    fn test_settle_with_assume_yes() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = GalleryConfig::default();
        config.storage.db_path = Some(dir.path().join("gallery.db"));

        let mut gallery = Gallery::open(config, TerminalSink::new(true)).unwrap();
        gallery.add_category("Lab").unwrap();
        gallery.request_delete_category("Lab").unwrap();
        settle(&mut gallery).unwrap();

        assert!(!gallery.categories().contains(&"Lab".to_string()));
    }
}
