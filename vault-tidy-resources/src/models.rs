use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::identity::Fingerprint;

/// Whether a run mutates the vault.
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Report decisions only.
    #[default]
    DryRun,
    /// Move files and rewrite notes.
    Execute,
}

impl RunMode {
    pub fn from_execute_flag(execute: bool) -> Self {
        if execute { Self::Execute } else { Self::DryRun }
    }

    pub fn is_execute(&self) -> bool {
        matches!(self, Self::Execute)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DryRun => "dry_run",
            Self::Execute => "execute",
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Reference graph ────────────────────────────────────────────────

/// One filesystem file carrying a referenced name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub path: PathBuf,
    pub fingerprint: Option<Fingerprint>,
}

/// What a reference name resolved to on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// No file with that name exists under the root.
    Missing,
    /// One resource. `fingerprint` is `None` when the file could not be read.
    Resolved {
        path: PathBuf,
        fingerprint: Option<Fingerprint>,
    },
    /// Several files share the name but not the content.
    Conflict { candidates: Vec<Candidate> },
}

/// A single `note -> resource` link, rebuilt on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceReference {
    pub note: PathBuf,
    /// Referenced file name (last component of the link path).
    pub name: String,
    /// Link path as written in the note.
    pub target: String,
    pub resolution: Resolution,
}

impl ResourceReference {
    pub fn resolved_path(&self) -> Option<&Path> {
        match &self.resolution {
            Resolution::Resolved { path, .. } => Some(path),
            Resolution::Missing | Resolution::Conflict { .. } => None,
        }
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        match &self.resolution {
            Resolution::Resolved { fingerprint, .. } => fingerprint.as_ref(),
            Resolution::Missing | Resolution::Conflict { .. } => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.resolution, Resolution::Missing)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.resolution, Resolution::Conflict { .. })
    }
}

/// References sharing a name whose resolved contents differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictSet {
    pub name: String,
    pub references: Vec<ResourceReference>,
}

impl ConflictSet {
    pub fn resolved_paths(&self) -> impl Iterator<Item = &Path> {
        self.references.iter().filter_map(|r| r.resolved_path())
    }
}

/// All notes referencing one concrete resource file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceGroup {
    pub resource: PathBuf,
    pub fingerprint: Option<Fingerprint>,
    /// Distinct referencing notes, in scan order.
    pub notes: Vec<PathBuf>,
}

// ── Moves ──────────────────────────────────────────────────────────

/// Result of applying the move policy to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Moved to the requested target.
    Moved { from: PathBuf, to: PathBuf },
    /// Target was taken by different content; moved under a suffixed name.
    Renamed {
        from: PathBuf,
        to: PathBuf,
        new_name: String,
    },
    /// Target already holds the same content; nothing moved.
    Identical { source: PathBuf, existing: PathBuf },
    /// Source does not exist.
    Missing { source: PathBuf },
    /// The filesystem refused the move.
    Failed {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

impl MoveOutcome {
    /// Where the resource lives once the outcome is applied.
    pub fn final_location(&self) -> Option<&Path> {
        match self {
            Self::Moved { to, .. } | Self::Renamed { to, .. } => Some(to),
            Self::Identical { existing, .. } => Some(existing),
            Self::Missing { .. } | Self::Failed { .. } => None,
        }
    }
}

/// A resource whose current path is not its optimal location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relocation {
    pub resource: PathBuf,
    pub destination: PathBuf,
    pub plan: MoveOutcome,
    pub notes: Vec<PathBuf>,
}

/// Phase 3 verdict for one reference group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PlacementDecision {
    AlreadyOptimal { resource: PathBuf },
    SkippedConflict { resource: PathBuf, name: String },
    Relocate(Relocation),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NoteUpdateStatus {
    /// Link text changed (or would change in a dry run).
    Rewritten,
    /// Links already pointed at the new location.
    Unchanged,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteUpdate {
    pub note: PathBuf,
    /// Link path written into the note.
    pub link: String,
    pub status: NoteUpdateStatus,
}

/// Phase 4 result for one relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationResult {
    pub resource: PathBuf,
    pub outcome: MoveOutcome,
    pub notes: Vec<NoteUpdate>,
}

// ── Errors and reports ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Read,
    MissingResource,
    Conflict,
    Move,
    Write,
}

/// A local, non-fatal problem recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedError {
    pub kind: ErrorKind,
    pub path: PathBuf,
    pub message: String,
}

impl ReportedError {
    pub fn new(kind: ErrorKind, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptimizeStats {
    pub notes_scanned: usize,
    pub references: usize,
    pub missing: usize,
    pub conflicting_references: usize,
    pub conflict_names: usize,
    pub moved: usize,
    pub renamed: usize,
    pub identical: usize,
    pub skipped_optimal: usize,
    pub skipped_conflict: usize,
    /// Notes whose text changed (or would change in a dry run).
    pub notes_updated: usize,
    /// Notes referencing a relocated resource, changed or not.
    pub notes_touched: usize,
    pub errors: usize,
}

/// Everything a resource optimisation run decided and did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizeReport {
    pub mode: RunMode,
    pub root: PathBuf,
    pub no_notes: bool,
    pub references: Vec<ResourceReference>,
    pub conflicts: Vec<ConflictSet>,
    pub decisions: Vec<PlacementDecision>,
    pub relocations: Vec<RelocationResult>,
    pub errors: Vec<ReportedError>,
    pub stats: OptimizeStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NoteSortOutcome {
    Moved { to: PathBuf, year: i32 },
    SkippedNoDate,
    SkippedExists { target: PathBuf },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteSortEntry {
    pub note: PathBuf,
    pub outcome: NoteSortOutcome,
    pub resources: Vec<MoveOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct YearSortStats {
    pub moved: usize,
    pub skipped_no_date: usize,
    pub skipped_exists: usize,
    pub resources_moved: usize,
    pub resources_renamed: usize,
    pub resources_missing: usize,
    pub resources_identical: usize,
    pub errors: usize,
}

/// Everything a sort-by-year run decided and did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSortReport {
    pub mode: RunMode,
    pub root: PathBuf,
    pub resources_dir: Option<PathBuf>,
    pub no_notes: bool,
    pub notes: Vec<NoteSortEntry>,
    pub errors: Vec<ReportedError>,
    pub stats: YearSortStats,
}
