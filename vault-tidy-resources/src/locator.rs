use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::warn;
use vault_tidy_core::LayoutSettings;
use walkdir::WalkDir;

use crate::models::{ErrorKind, ReportedError};

/// Every file under `root` named exactly `file_name`, in walk order.
///
/// Entries the walk cannot read are returned as errors next to the paths
/// found so far.
pub fn find(file_name: &str, root: &Path) -> (Vec<PathBuf>, Vec<ReportedError>) {
    let (files, errors) = files_under(WalkDir::new(root), root);
    let found = files
        .into_iter()
        .filter(|path| path.file_name().and_then(|v| v.to_str()) == Some(file_name))
        .collect();
    (found, errors)
}

/// [`find`] for each name, sharing a single walk of `root`.
///
/// Every requested name is present in the result, with an empty list when
/// nothing matched.
pub fn find_many<'a, I>(
    file_names: I,
    root: &Path,
) -> (BTreeMap<String, Vec<PathBuf>>, Vec<ReportedError>)
where
    I: IntoIterator<Item = &'a str>,
{
    let wanted: BTreeSet<&str> = file_names.into_iter().collect();
    let mut found: BTreeMap<String, Vec<PathBuf>> = wanted
        .iter()
        .map(|name| (name.to_string(), Vec::new()))
        .collect();
    if wanted.is_empty() {
        return (found, Vec::new());
    }

    let (files, errors) = files_under(WalkDir::new(root), root);
    for path in files {
        let Some(name) = path.file_name().and_then(|v| v.to_str()) else {
            continue;
        };
        if let Some(paths) = found.get_mut(name) {
            paths.push(path);
        }
    }
    (found, errors)
}

/// Note files under `root`, sorted per directory. With `recursive == false`
/// only direct children are returned.
pub fn collect_notes(
    root: &Path,
    layout: &LayoutSettings,
    recursive: bool,
) -> (Vec<PathBuf>, Vec<ReportedError>) {
    let walker = WalkDir::new(root).min_depth(1);
    let walker = if recursive { walker } else { walker.max_depth(1) };

    let (files, errors) = files_under(walker, root);
    let notes = files
        .into_iter()
        .filter(|path| {
            path.extension()
                .and_then(|v| v.to_str())
                .is_some_and(|ext| layout.is_note_extension(ext))
        })
        .collect();
    (notes, errors)
}

/// Regular files reached by `walker`, following symlinked folders. Unreadable
/// entries and symlink loops become read errors.
fn files_under(walker: WalkDir, root: &Path) -> (Vec<PathBuf>, Vec<ReportedError>) {
    let mut files = Vec::new();
    let mut errors = Vec::new();

    for entry in walker.follow_links(true).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => {
                warn!("Error while walking {}: {}", root.display(), e);
                let path = e.path().unwrap_or(root);
                errors.push(ReportedError::new(ErrorKind::Read, path, e.to_string()));
            }
        }
    }
    (files, errors)
}
