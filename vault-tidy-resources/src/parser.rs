use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::warn;

use crate::errors::{TidyError, TidyResult};

static FRONT_MATTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A---\s*\n(.*?)\n---").expect("regex"));

static CREATED_AT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Created at:[ \t]*(\d{4})-(\d{2})-(\d{2})").expect("regex")
});

static FILENAME_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})_").expect("regex"));

/// A `[[<resources>/<file>]]` link found in note text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceLink {
    /// `true` for `![[...]]`, `false` for a bare `[[...]]`.
    pub embedded: bool,
    /// Link path as written, e.g. `_resources/photo.png`.
    pub target: String,
    /// `#...` suffix (PDF page, heading) if present, without the `#`.
    pub anchor: Option<String>,
    /// Display text after `|`, if present.
    pub alias: Option<String>,
}

impl ResourceLink {
    /// Last path component of the target.
    pub fn file_name(&self) -> &str {
        file_name_of(&self.target)
    }
}

fn file_name_of(target: &str) -> &str {
    target.rsplit('/').next().unwrap_or(target)
}

/// Finds and rewrites links that point into the resource folder.
///
/// Only links whose path contains the resource folder as a full segment are
/// recognised, so `[[photo.png]]` or `[[my_resources/photo.png]]` are left
/// alone.
#[derive(Debug, Clone)]
pub struct LinkParser {
    pattern: Regex,
}

impl LinkParser {
    pub fn new(resources_dir: &str) -> TidyResult<Self> {
        let pattern = Regex::new(&format!(
            r"(?P<embed>!?)\[\[(?P<target>(?:[^\[\]|#/]+/)*{dir}/[^\[\]|#]+?)(?P<anchor>#[^\[\]|]*)?(?P<display>\|(?P<alias>[^\[\]]*))?\]\]",
            dir = regex::escape(resources_dir)
        ))?;
        Ok(Self { pattern })
    }

    /// All resource links in order of appearance. Duplicates are kept.
    pub fn extract_resource_links(&self, raw: &str) -> Vec<ResourceLink> {
        self.pattern
            .captures_iter(raw)
            .map(|cap| ResourceLink {
                embedded: !cap["embed"].is_empty(),
                target: cap["target"].trim().to_string(),
                anchor: cap
                    .name("anchor")
                    .map(|m| m.as_str().trim_start_matches('#').to_string()),
                alias: cap.name("alias").map(|m| m.as_str().to_string()),
            })
            .collect()
    }

    /// Link targets (`_resources/<file>`) in order of appearance.
    pub fn extract_resource_references(&self, raw: &str) -> Vec<String> {
        self.extract_resource_links(raw)
            .into_iter()
            .map(|link| link.target)
            .collect()
    }

    /// Point every link to `old_filename` at `replacement`.
    ///
    /// A bare file name in `replacement` swaps only the last path component and
    /// keeps the folder prefix; a value containing `/` replaces the whole link
    /// path. The embed marker, `#anchor` and `|display` parts are preserved.
    pub fn rewrite_reference(&self, raw: &str, old_filename: &str, replacement: &str) -> String {
        self.rewrite_with(raw, |name| (name == old_filename).then_some(replacement))
    }

    /// [`rewrite_reference`](Self::rewrite_reference) for several file names in
    /// one pass over `raw`.
    ///
    /// Each link is matched against the original text only, so a link written
    /// for one rename is never picked up by another (`a.png -> b.png` next to
    /// `b.png -> c.png` does not turn `a.png` into `c.png`).
    pub fn rewrite_references(&self, raw: &str, renames: &BTreeMap<String, String>) -> String {
        self.rewrite_with(raw, |name| renames.get(name).map(String::as_str))
    }

    fn rewrite_with<'r, F>(&self, raw: &str, replacement_for: F) -> String
    where
        F: Fn(&str) -> Option<&'r str>,
    {
        self.pattern
            .replace_all(raw, |cap: &Captures| {
                let target = &cap["target"];
                let old_filename = file_name_of(target);
                let Some(replacement) = replacement_for(old_filename) else {
                    return cap[0].to_string();
                };

                let new_target = if replacement.contains('/') {
                    replacement.to_string()
                } else {
                    format!(
                        "{}{}",
                        &target[..target.len() - old_filename.len()],
                        replacement
                    )
                };

                format!(
                    "{}[[{}{}{}]]",
                    &cap["embed"],
                    new_target,
                    cap.name("anchor").map_or("", |m| m.as_str()),
                    cap.name("display").map_or("", |m| m.as_str()),
                )
            })
            .into_owned()
    }
}

/// Year from a `Created at: YYYY-MM-DD` line in the front matter, falling back
/// to a `YYYYMMDD_` file name prefix.
pub fn extract_date_year(raw: &str, file_name: &str) -> Option<i32> {
    front_matter_year(raw).or_else(|| year_from_filename(file_name))
}

/// Year from the front matter block, if it holds a valid `Created at` date.
pub fn front_matter_year(raw: &str) -> Option<i32> {
    let block = FRONT_MATTER.captures(raw)?.get(1)?.as_str();
    let cap = CREATED_AT.captures(block)?;
    let year: i32 = cap[1].parse().ok()?;
    let month: u32 = cap[2].parse().ok()?;
    let day: u32 = cap[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|_| year)
}

/// Year from a `YYYYMMDD_` prefix, accepting years 1900-2100, months 1-12 and
/// days 1-31.
pub fn year_from_filename(file_name: &str) -> Option<i32> {
    let cap = FILENAME_DATE.captures(file_name)?;
    let year: i32 = cap[1].parse().ok()?;
    let month: u32 = cap[2].parse().ok()?;
    let day: u32 = cap[3].parse().ok()?;

    if (1900..=2100).contains(&year) && (1..=12).contains(&month) && (1..=31).contains(&day) {
        Some(year)
    } else {
        None
    }
}

/// Year for the note at `path`. Unreadable notes are logged and yield `None`.
pub fn year_for(path: &Path) -> Option<i32> {
    let file_name = path.file_name().and_then(|v| v.to_str()).unwrap_or_default();
    match read_note(path) {
        Ok(raw) => extract_date_year(&raw, file_name),
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

/// Read a note as UTF-8 text.
pub fn read_note(path: &Path) -> TidyResult<String> {
    std::fs::read_to_string(path).map_err(|source| TidyError::NoteRead {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_note(path: &Path, content: &str) -> TidyResult<()> {
    std::fs::write(path, content).map_err(|source| TidyError::NoteWrite {
        path: path.to_path_buf(),
        source,
    })
}
