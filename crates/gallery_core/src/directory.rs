//! Category and tag directory
//!
//! Category listings are derived from the repository snapshot on every call.
//! Mutations validate first, then run as a single store transaction and
//! reload the snapshot.

use crate::filter::{ALL_LABEL, FALLBACK_CATEGORY};
use crate::repository::ImageRepository;
use crate::{GalleryError, Result};
use gallery_archive::is_valid_component;
use std::collections::BTreeSet;

/// Names that can never be created or renamed to
pub const RESERVED_CATEGORIES: &[&str] = &[ALL_LABEL, FALLBACK_CATEGORY, "all"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_CATEGORIES.contains(&name)
}

/// Every known category, sorted, with the fallback label last
pub fn list_categories(repo: &ImageRepository) -> Vec<String> {
    let real = repo.images().iter().filter_map(|r| r.category_name());
    let registered = repo.registered_categories().iter().map(String::as_str);

    let names: BTreeSet<&str> = registered
        .chain(real)
        .filter(|name| !name.is_empty() && !is_reserved(name))
        .collect();

    let mut categories: Vec<String> = names.into_iter().map(str::to_string).collect();
    categories.push(FALLBACK_CATEGORY.to_string());
    categories
}

/// Does the category appear in `list_categories` (fallback excluded)?
pub fn category_exists(repo: &ImageRepository, name: &str) -> bool {
    repo.registered_categories().iter().any(|c| c == name)
        || repo.images().iter().any(|r| r.category_name() == Some(name))
}

/// Number of images filed under `name`
pub fn category_usage(repo: &ImageRepository, name: &str) -> usize {
    repo.images()
        .iter()
        .filter(|r| r.category_name() == Some(name))
        .count()
}

/// Category names double as archive folder names, so they must come out of
/// `sanitize_component` unchanged.
pub fn check_category_name(name: &str) -> Result<()> {
    if !is_valid_component(name) {
        return Err(GalleryError::validation(format!(
            "\"{}\" cannot be used as a category name",
            name
        )));
    }
    Ok(())
}

fn validate_new_name(repo: &ImageRepository, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(GalleryError::validation("Category name cannot be empty"));
    }
    check_category_name(name)?;
    if is_reserved(name) {
        return Err(GalleryError::validation(format!("\"{}\" is a reserved category name", name)));
    }
    if category_exists(repo, name) {
        return Err(GalleryError::validation(format!("Category \"{}\" already exists", name)));
    }
    Ok(())
}

/// Register a new, possibly empty, category. Returns the trimmed name.
pub fn add_category(repo: &mut ImageRepository, name: &str) -> Result<String> {
    let name = name.trim();
    validate_new_name(repo, name)?;

    repo.store().add_category(name)?;
    repo.load()?;

    tracing::info!(category = name, "Category added");
    Ok(name.to_string())
}

/// Rename a category everywhere. Returns the number of images rewritten.
pub fn rename_category(repo: &mut ImageRepository, old: &str, new: &str) -> Result<usize> {
    let new = new.trim();

    if is_reserved(old) {
        return Err(GalleryError::validation(format!("\"{}\" cannot be renamed", old)));
    }
    if !category_exists(repo, old) {
        return Err(GalleryError::validation(format!("Category \"{}\" does not exist", old)));
    }
    validate_new_name(repo, new)?;

    let changed = repo.store().rename_category(old, new)?;
    repo.load()?;

    tracing::info!(old, new, changed, "Category renamed");
    Ok(changed)
}

/// Unregister a category. Its images stay, uncategorized.
///
/// Returns the number of images rewritten.
pub fn delete_category(repo: &mut ImageRepository, name: &str) -> Result<usize> {
    if is_reserved(name) {
        return Err(GalleryError::validation(format!("\"{}\" cannot be deleted", name)));
    }

    let changed = repo.store().delete_category(name)?;
    repo.load()?;

    tracing::info!(category = name, changed, "Category deleted");
    Ok(changed)
}

/// Every tag in use. Tags from `priority` come first in that order, then
/// the rest sorted.
pub fn list_tags<S: AsRef<str>>(repo: &ImageRepository, priority: &[S]) -> Vec<String> {
    let all: BTreeSet<&str> = repo
        .images()
        .iter()
        .flat_map(|r| r.tags.iter().map(String::as_str))
        .collect();

    let mut tags: Vec<String> = Vec::with_capacity(all.len());
    for tag in priority {
        let tag = tag.as_ref();
        if all.contains(tag) && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    let rest: Vec<String> = all
        .into_iter()
        .filter(|t| !tags.iter().any(|p| p == t))
        .map(str::to_string)
        .collect();
    tags.extend(rest);
    tags
}

/// Number of images carrying `tag`
pub fn tag_usage(repo: &ImageRepository, tag: &str) -> usize {
    repo.images().iter().filter(|r| r.has_tag(tag)).count()
}

/// Rename a tag on every image. Returns the number of images rewritten.
pub fn rename_tag(repo: &mut ImageRepository, old: &str, new: &str) -> Result<usize> {
    let new = new.trim();

    if new.is_empty() {
        return Err(GalleryError::validation("Tag name cannot be empty"));
    }
    if tag_usage(repo, old) == 0 {
        return Err(GalleryError::validation(format!("Tag \"{}\" does not exist", old)));
    }
    if old == new {
        return Ok(0);
    }

    let changed = repo.store().iterate_and_mutate(
        |r| r.has_tag(old),
        |r| {
            let mut renamed = Vec::with_capacity(r.tags.len());
            for tag in r.tags.drain(..) {
                let tag = if tag == old { new.to_string() } else { tag };
                if !renamed.contains(&tag) {
                    renamed.push(tag);
                }
            }
            r.tags = renamed;
        },
    )?;
    repo.load()?;

    tracing::info!(old, new, changed, "Tag renamed");
    Ok(changed)
}

/// Remove a tag from every image. Returns the number of images rewritten.
pub fn delete_tag(repo: &mut ImageRepository, name: &str) -> Result<usize> {
    let changed = repo
        .store()
        .iterate_and_mutate(|r| r.has_tag(name), |r| r.tags.retain(|t| t != name))?;
    repo.load()?;

    tracing::info!(tag = name, changed, "Tag deleted");
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::tests::{open_repo, png};
    use crate::DetailDraft;

    fn tag(repo: &mut ImageRepository, name: &str, tags: &[&str]) {
        let id = repo.find_by_name(name).unwrap().id;
        let mut draft: DetailDraft = repo.begin_edit(id).unwrap();
        for t in tags {
            draft.add_tag(t);
        }
        repo.save_detail(&draft).unwrap();
    }

    #[test]
    fn test_list_categories() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", Some("Lab"))).unwrap();
        repo.save(png("b.png", Some(""))).unwrap();
        repo.save(png("c.png", None)).unwrap();
        add_category(&mut repo, "Archive").unwrap();

        assert_eq!(list_categories(&repo), vec!["Archive", "Lab", FALLBACK_CATEGORY]);
    }

    #[test]
    fn test_fallback_always_listed() {
        let (_dir, repo) = open_repo();
        assert_eq!(list_categories(&repo), vec![FALLBACK_CATEGORY]);
    }

    #[test]
    fn test_add_category_validation() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", Some("Lab"))).unwrap();

        for bad in ["", "   ", "其他", "全部", "all", "Lab"] {
            assert!(
                matches!(add_category(&mut repo, bad), Err(GalleryError::Validation(_))),
                "{:?} should be rejected",
                bad
            );
        }
        assert!(repo.registered_categories().is_empty());

        assert_eq!(add_category(&mut repo, "  Field ").unwrap(), "Field");
        assert_eq!(repo.registered_categories(), ["Field".to_string()]);
    }

    #[test]
    fn test_unsafe_category_names_rejected() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", Some("Lab"))).unwrap();

        for name in ["PBT/PET", "a\\b", "x:y", "CON", "Lab."] {
            assert!(matches!(add_category(&mut repo, name), Err(GalleryError::Validation(_))));
            assert!(rename_category(&mut repo, "Lab", name).is_err());
        }
        assert!(repo.registered_categories().is_empty());
        assert_eq!(repo.find_by_name("a.png").unwrap().category.as_deref(), Some("Lab"));
        assert!(check_category_name("PBT-PET").is_ok());
    }

    #[test]
    fn test_rename_category() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", Some("A"))).unwrap();
        repo.save(png("b.png", Some("A"))).unwrap();
        add_category(&mut repo, "Empty").unwrap();

        assert_eq!(rename_category(&mut repo, "A", "B").unwrap(), 2);
        let categories = list_categories(&repo);
        assert!(categories.contains(&"B".to_string()));
        assert!(!categories.contains(&"A".to_string()));
        assert!(repo.images().iter().all(|r| r.category.as_deref() == Some("B")));

        rename_category(&mut repo, "Empty", "Still empty").unwrap();
        assert_eq!(repo.registered_categories(), ["Still empty".to_string()]);
    }

    #[test]
    fn test_rename_category_rejections() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", Some("A"))).unwrap();
        repo.save(png("b.png", Some("B"))).unwrap();
        let before = repo.images().to_vec();

        assert!(rename_category(&mut repo, "A", FALLBACK_CATEGORY).is_err());
        assert!(rename_category(&mut repo, "A", "B").is_err());
        assert!(rename_category(&mut repo, "A", " ").is_err());
        assert!(rename_category(&mut repo, "Missing", "C").is_err());
        assert!(rename_category(&mut repo, FALLBACK_CATEGORY, "C").is_err());

        assert_eq!(repo.images(), before.as_slice());
    }

    #[test]
    fn test_delete_category_keeps_images() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", Some("A"))).unwrap();
        add_category(&mut repo, "Empty").unwrap();

        assert_eq!(delete_category(&mut repo, "A").unwrap(), 1);
        assert_eq!(delete_category(&mut repo, "Empty").unwrap(), 0);

        assert_eq!(repo.images().len(), 1);
        assert_eq!(repo.images()[0].category, None);
        assert_eq!(list_categories(&repo), vec![FALLBACK_CATEGORY]);
        assert!(delete_category(&mut repo, FALLBACK_CATEGORY).is_err());
    }

    #[test]
    fn test_list_tags_priority() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", None)).unwrap();
        repo.save(png("b.png", None)).unwrap();
        tag(&mut repo, "a.png", &["zeta", "PET"]);
        tag(&mut repo, "b.png", &["alpha", "PBT"]);

        assert_eq!(list_tags::<&str>(&repo, &[]), vec!["PBT", "PET", "alpha", "zeta"]);
        assert_eq!(
            list_tags(&repo, &["zeta", "missing", "PET"]),
            vec!["zeta", "PET", "PBT", "alpha"]
        );
    }

    #[test]
    fn test_rename_tag_deduplicates() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", Some("Lab"))).unwrap();
        repo.save(png("b.png", None)).unwrap();
        tag(&mut repo, "a.png", &["old", "new", "x"]);
        tag(&mut repo, "b.png", &["old"]);

        assert_eq!(rename_tag(&mut repo, "old", "new").unwrap(), 2);
        assert_eq!(repo.find_by_name("a.png").unwrap().tags, vec!["new", "x"]);
        assert_eq!(repo.find_by_name("b.png").unwrap().tags, vec!["new"]);
        assert_eq!(repo.find_by_name("a.png").unwrap().category.as_deref(), Some("Lab"));

        assert!(rename_tag(&mut repo, "old", "other").is_err());
        assert!(rename_tag(&mut repo, "new", "  ").is_err());
    }

    #[test]
    fn test_delete_tag() {
        let (_dir, mut repo) = open_repo();
        repo.save(png("a.png", None)).unwrap();
        tag(&mut repo, "a.png", &["PBT", "PET"]);

        assert_eq!(delete_tag(&mut repo, "PBT").unwrap(), 1);
        assert_eq!(repo.images()[0].tags, vec!["PET"]);
        assert_eq!(delete_tag(&mut repo, "PBT").unwrap(), 0);
    }
}
