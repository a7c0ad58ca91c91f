use std::path::{Component, Path, PathBuf};

use crate::errors::{TidyError, TidyResult};

/// Fail unless `root` is an existing directory.
pub fn validate_root(root: &Path) -> TidyResult<()> {
    if !root.exists() {
        return Err(TidyError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(TidyError::RootNotDirectory(root.to_path_buf()));
    }
    Ok(())
}

/// `<dir>/<resources_dir>/<file_name>`
pub fn resource_location(dir: &Path, resources_dir: &str, file_name: &str) -> PathBuf {
    dir.join(resources_dir).join(file_name)
}

/// Link path for `resource` as seen from `note`.
///
/// Relative to the note's directory when the resource sits inside it,
/// otherwise `<resources_dir>/<file name>`. Always uses `/` separators.
pub fn note_relative_link(note: &Path, resource: &Path, resources_dir: &str) -> String {
    let file_name = resource
        .file_name()
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_default();

    let relative = note
        .parent()
        .and_then(|dir| resource.strip_prefix(dir).ok())
        .map(to_link_path)
        .filter(|link| !link.is_empty());

    relative.unwrap_or_else(|| format!("{}/{}", resources_dir, file_name))
}

/// Path relative to `root` for display, falling back to the full path.
pub fn display_relative(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => to_link_path(relative),
        _ => path.display().to_string(),
    }
}

fn to_link_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
