//! Sort notes into `<year>/` folders, carrying their resources along.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use tracing::{error, info, warn};
use vault_tidy_core::LayoutSettings;

use crate::errors::TidyResult;
use crate::locator::collect_notes;
use crate::models::{
    ErrorKind, MoveOutcome, NoteSortEntry, NoteSortOutcome, ReportedError, RunMode,
    YearSortReport, YearSortStats,
};
use crate::mover::{MoveStaging, apply_move, log_outcome, move_file};
use crate::parser::{LinkParser, extract_date_year, read_note, write_note};
use crate::paths::{resource_location, validate_root};

pub struct YearSorter {
    layout: LayoutSettings,
    parser: LinkParser,
    mode: RunMode,
}

impl YearSorter {
    pub fn new(layout: LayoutSettings, mode: RunMode) -> TidyResult<Self> {
        let parser = LinkParser::new(&layout.resources_dir)?;
        Ok(Self {
            layout,
            parser,
            mode,
        })
    }

    /// Move every dated note directly inside `dir` into `dir/<year>/`.
    ///
    /// Resources are looked up by file name in `resources_dir` and moved to
    /// `dir/<year>/<resources folder>/`.
    pub fn run(&self, dir: &Path, resources_dir: Option<&Path>) -> TidyResult<YearSortReport> {
        validate_root(dir)?;

        let resources_dir = resources_dir.and_then(|path| {
            if path.is_dir() {
                Some(path.to_path_buf())
            } else {
                warn!(
                    "Resources directory {} not found, moving notes only",
                    path.display()
                );
                None
            }
        });

        let mut report = YearSortReport {
            mode: self.mode,
            root: dir.to_path_buf(),
            resources_dir: resources_dir.clone(),
            no_notes: false,
            notes: Vec::new(),
            errors: Vec::new(),
            stats: YearSortStats::default(),
        };

        let (notes, walk_errors) = collect_notes(dir, &self.layout, false);
        report.errors = walk_errors;
        if notes.is_empty() {
            info!("No notes found in {}", dir.display());
            report.no_notes = true;
            report.stats.errors = report.errors.len();
            return Ok(report);
        }
        info!("Found {} note(s) in {}", notes.len(), dir.display());

        let mut staging = MoveStaging::new(self.layout.hash_chunk_size);
        for note in &notes {
            let entry = self.sort_note(
                dir,
                note,
                resources_dir.as_deref(),
                &mut staging,
                &mut report.errors,
            );
            report.notes.push(entry);
        }

        report.stats = tally(&report);
        Ok(report)
    }

    fn sort_note(
        &self,
        dir: &Path,
        note: &Path,
        resources_dir: Option<&Path>,
        staging: &mut MoveStaging,
        errors: &mut Vec<ReportedError>,
    ) -> NoteSortEntry {
        let mut entry = NoteSortEntry {
            note: note.to_path_buf(),
            outcome: NoteSortOutcome::SkippedNoDate,
            resources: Vec::new(),
        };

        let raw = match read_note(note) {
            Ok(raw) => raw,
            Err(e) => {
                error!("{}", e);
                errors.push(ReportedError::new(ErrorKind::Read, note, e.to_string()));
                entry.outcome = NoteSortOutcome::Failed {
                    error: e.to_string(),
                };
                return entry;
            }
        };

        let file_name = note
            .file_name()
            .map(|v| v.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(year) = extract_date_year(&raw, &file_name) else {
            warn!("No date found for {}", note.display());
            return entry;
        };

        let year_dir = dir.join(year.to_string());
        let target = year_dir.join(&file_name);
        if staging.exists(&target) {
            warn!("Skipping {}: {} already exists", note.display(), target.display());
            entry.outcome = NoteSortOutcome::SkippedExists { target };
            return entry;
        }

        let links = match resources_dir {
            Some(_) => self.parser.extract_resource_links(&raw),
            None => Vec::new(),
        };

        staging.record_move(note, &target);
        if self.mode.is_execute() {
            if let Err(e) = move_file(note, &target) {
                error!("{}", e);
                staging.cancel_move(note, &target);
                errors.push(ReportedError::new(ErrorKind::Move, note, e.to_string()));
                entry.outcome = NoteSortOutcome::Failed {
                    error: e.to_string(),
                };
                return entry;
            }
            info!("Moved {} -> {}", note.display(), target.display());
        } else {
            info!("Would move {} -> {}", note.display(), target.display());
        }
        entry.outcome = NoteSortOutcome::Moved {
            to: target.clone(),
            year,
        };

        let Some(resources_dir) = resources_dir else {
            return entry;
        };
        let note_now = if self.mode.is_execute() { target.as_path() } else { note };

        let mut renames = BTreeMap::new();
        let mut seen = HashSet::new();
        for link in links.iter().filter(|link| seen.insert(link.file_name())) {
            let name = link.file_name();
            let source = resources_dir.join(name);
            let destination = resource_location(&year_dir, &self.layout.resources_dir, name);

            let plan = staging.plan(&source, &destination);
            let outcome = if self.mode.is_execute() {
                apply_move(&plan)
            } else {
                plan
            };
            log_outcome(&outcome, self.mode.is_execute());

            match &outcome {
                MoveOutcome::Renamed { new_name, .. } => {
                    renames.insert(name.to_string(), new_name.clone());
                }
                MoveOutcome::Missing { source } => {
                    errors.push(ReportedError::new(
                        ErrorKind::MissingResource,
                        source,
                        format!("resource not found: {}", name),
                    ));
                }
                MoveOutcome::Failed { from, to, error } => {
                    staging.cancel_move(from, to);
                    errors.push(ReportedError::new(ErrorKind::Move, from, error.clone()));
                }
                MoveOutcome::Moved { .. } | MoveOutcome::Identical { .. } => {}
            }
            entry.resources.push(outcome);
        }

        if !renames.is_empty() {
            if let Err(e) = self.rename_links(note_now, &renames) {
                error!("{}", e);
                errors.push(ReportedError::new(ErrorKind::Write, note_now, e.to_string()));
            }
        }
        entry
    }

    /// Point `note`'s links at the renamed resources in one pass. Dry runs only
    /// check the note is readable.
    fn rename_links(&self, note: &Path, renames: &BTreeMap<String, String>) -> TidyResult<()> {
        let raw = read_note(note)?;
        if !self.mode.is_execute() {
            info!("Would update {} link(s) in {}", renames.len(), note.display());
            return Ok(());
        }
        let updated = self.parser.rewrite_references(&raw, renames);
        if updated != raw {
            write_note(note, &updated)?;
            info!("Updated {} link(s) in {}", renames.len(), note.display());
        }
        Ok(())
    }
}

fn tally(report: &YearSortReport) -> YearSortStats {
    let mut stats = YearSortStats {
        errors: report.errors.len(),
        ..YearSortStats::default()
    };
    for entry in &report.notes {
        match entry.outcome {
            NoteSortOutcome::Moved { .. } => stats.moved += 1,
            NoteSortOutcome::SkippedNoDate => stats.skipped_no_date += 1,
            NoteSortOutcome::SkippedExists { .. } => stats.skipped_exists += 1,
            NoteSortOutcome::Failed { .. } => {}
        }
        for outcome in &entry.resources {
            match outcome {
                MoveOutcome::Moved { .. } => stats.resources_moved += 1,
                MoveOutcome::Renamed { .. } => stats.resources_renamed += 1,
                MoveOutcome::Missing { .. } => stats.resources_missing += 1,
                MoveOutcome::Identical { .. } => stats.resources_identical += 1,
                MoveOutcome::Failed { .. } => {}
            }
        }
    }
    stats
}
