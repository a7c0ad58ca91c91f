//! Resource move policy shared by the optimizer and the year sort.
//!
//! Decisions are made against a [`MoveStaging`] overlay that remembers moves
//! planned earlier in the same run, so a dry run sees the vault exactly as an
//! executing run would at the same point.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::errors::TidyError;
use crate::identity::identical;
use crate::models::MoveOutcome;

/// Real filesystem plus the moves planned so far in this run.
#[derive(Debug, Default)]
pub struct MoveStaging {
    chunk_size: usize,
    vacated: HashSet<PathBuf>,
    /// destination -> file whose bytes will be there
    placed: HashMap<PathBuf, PathBuf>,
}

impl MoveStaging {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            ..Self::default()
        }
    }

    pub fn exists(&self, path: &Path) -> bool {
        if self.placed.contains_key(path) {
            return true;
        }
        if self.vacated.contains(path) {
            return false;
        }
        path.exists()
    }

    /// On-disk file that currently holds the bytes staged at `path`.
    fn content_path<'a>(&'a self, path: &'a Path) -> &'a Path {
        self.placed.get(path).map(PathBuf::as_path).unwrap_or(path)
    }

    /// First of `target`, `stem_1.ext`, `stem_2.ext`, ... that is free.
    pub fn unique_filename(&self, target: &Path) -> PathBuf {
        if !self.exists(target) {
            return target.to_path_buf();
        }

        let stem = target
            .file_stem()
            .map(|v| v.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = target
            .extension()
            .map(|v| format!(".{}", v.to_string_lossy()))
            .unwrap_or_default();
        let parent = target.parent().unwrap_or_else(|| Path::new(""));

        let mut counter = 1usize;
        loop {
            let candidate = parent.join(format!("{}_{}{}", stem, counter, extension));
            if !self.exists(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Decide how `source` reaches `target` and stage the result.
    ///
    /// Never returns [`MoveOutcome::Failed`]; that only comes from
    /// [`apply_move`].
    pub fn plan(&mut self, source: &Path, target: &Path) -> MoveOutcome {
        if !self.exists(source) {
            return MoveOutcome::Missing {
                source: source.to_path_buf(),
            };
        }

        if !self.exists(target) {
            self.record_move(source, target);
            return MoveOutcome::Moved {
                from: source.to_path_buf(),
                to: target.to_path_buf(),
            };
        }

        if identical(
            self.content_path(source),
            self.content_path(target),
            self.chunk_size,
        ) {
            return MoveOutcome::Identical {
                source: source.to_path_buf(),
                existing: target.to_path_buf(),
            };
        }

        let unique = self.unique_filename(target);
        let new_name = unique
            .file_name()
            .map(|v| v.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.record_move(source, &unique);
        MoveOutcome::Renamed {
            from: source.to_path_buf(),
            to: unique,
            new_name,
        }
    }

    /// Stage a move decided elsewhere (note moves).
    pub fn record_move(&mut self, from: &Path, to: &Path) {
        let origin = self
            .placed
            .remove(from)
            .unwrap_or_else(|| from.to_path_buf());
        self.vacated.insert(from.to_path_buf());
        self.vacated.remove(to);
        self.placed.insert(to.to_path_buf(), origin);
    }

    /// Undo a staged move whose execution failed.
    pub fn cancel_move(&mut self, from: &Path, to: &Path) {
        if let Some(origin) = self.placed.remove(to) {
            self.vacated.remove(from);
            if origin != from {
                self.placed.insert(from.to_path_buf(), origin);
            }
        }
    }
}

/// Perform a planned move on disk. Outcomes without a move pass through.
pub fn apply_move(plan: &MoveOutcome) -> MoveOutcome {
    let (from, to) = match plan {
        MoveOutcome::Moved { from, to } | MoveOutcome::Renamed { from, to, .. } => (from, to),
        MoveOutcome::Identical { .. } | MoveOutcome::Missing { .. } | MoveOutcome::Failed { .. } => {
            return plan.clone();
        }
    };

    match move_file(from, to) {
        Ok(()) => plan.clone(),
        Err(e) => {
            error!("{}", e);
            MoveOutcome::Failed {
                from: from.clone(),
                to: to.clone(),
                error: e.to_string(),
            }
        }
    }
}

/// Create the parent of `to` and rename `from` onto it.
pub(crate) fn move_file(from: &Path, to: &Path) -> Result<(), TidyError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|source| TidyError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::rename(from, to).map_err(|source| TidyError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// Log a move outcome the way both workflows report it.
pub(crate) fn log_outcome(outcome: &MoveOutcome, execute: bool) {
    match outcome {
        MoveOutcome::Moved { from, to } => {
            let verb = if execute { "Moved" } else { "Would move" };
            info!("{} resource {} -> {}", verb, from.display(), to.display());
        }
        MoveOutcome::Renamed { from, to, new_name } => {
            let verb = if execute { "Renamed" } else { "Would rename" };
            info!(
                "{} resource {} -> {} (as {})",
                verb,
                from.display(),
                to.display(),
                new_name
            );
        }
        MoveOutcome::Identical { source, existing } => {
            info!(
                "Resource {} identical to {}, not duplicated",
                source.display(),
                existing.display()
            );
        }
        MoveOutcome::Missing { source } => {
            warn!("Resource not found: {}", source.display());
        }
        MoveOutcome::Failed { from, error, .. } => {
            error!("Failed to move resource {}: {}", from.display(), error);
        }
    }
}
