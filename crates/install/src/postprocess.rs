//! Post-extraction discovery of an item's icon and entry page
//!
//! Bundles follow a directory convention: the icon is the first `.svg`
//! inside the item's first subdirectory, and the entry page is the first
//! `index.html` anywhere in the tree. Registered paths are app-root-relative
//! with forward slashes, ready to serve as URLs.

use malt_types::ItemKind;
use std::path::Path;

/// Locate the item's icon by directory convention
#[must_use]
pub fn find_icon(item_dir: &Path, kind: ItemKind, name: &str) -> Option<String> {
    let first_subdir = sorted_entries(item_dir)?
        .into_iter()
        .find(|path| path.is_dir())?;

    let svg = sorted_entries(&first_subdir)?.into_iter().find(|path| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
    })?;

    let subdir_name = first_subdir.file_name()?.to_str()?.to_string();
    let file_name = svg.file_name()?.to_str()?.to_string();
    Some(format!(
        "asset/{}/{name}/{subdir_name}/{file_name}",
        kind.dir_name()
    ))
}

/// Locate the item's `index.html` and return its path relative to the
/// application root, with forward slashes
#[must_use]
pub fn find_index(item_dir: &Path, app_root: &Path) -> Option<String> {
    let found = find_index_file(item_dir)?;
    let relative = found.strip_prefix(app_root).ok()?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}

fn find_index_file(dir: &Path) -> Option<std::path::PathBuf> {
    let entries = sorted_entries(dir)?;

    for path in &entries {
        if path.is_file() && path.file_name().is_some_and(|name| name == "index.html") {
            return Some(path.clone());
        }
    }
    for path in &entries {
        if path.is_dir() {
            if let Some(found) = find_index_file(path) {
                return Some(found);
            }
        }
    }
    None
}

fn sorted_entries(dir: &Path) -> Option<Vec<std::path::PathBuf>> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .collect();
    entries.sort();
    Some(entries)
}
