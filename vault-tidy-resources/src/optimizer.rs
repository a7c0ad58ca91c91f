//! Resource optimisation run: move every resource next to the notes that use
//! it and repoint their links.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};
use vault_tidy_core::LayoutSettings;

use crate::errors::TidyResult;
use crate::graph::{build_reference_array, detect_conflicts, group_by_resource, plan_relocations};
use crate::locator::collect_notes;
use crate::models::{
    ErrorKind, MoveOutcome, NoteUpdate, NoteUpdateStatus, OptimizeReport, OptimizeStats,
    PlacementDecision, RelocationResult, ReportedError, RunMode,
};
use crate::mover::{MoveStaging, apply_move, log_outcome};
use crate::parser::{LinkParser, read_note, write_note};
use crate::paths::{note_relative_link, validate_root};

/// Link change one relocation asks of one note.
struct PendingLink {
    relocation: usize,
    old_name: String,
    link: String,
}

/// Phase 4 output.
struct AppliedPlans {
    decisions: Vec<PlacementDecision>,
    relocations: Vec<RelocationResult>,
    errors: Vec<ReportedError>,
}

pub struct ResourceOptimizer {
    layout: LayoutSettings,
    parser: LinkParser,
    mode: RunMode,
}

impl ResourceOptimizer {
    pub fn new(layout: LayoutSettings, mode: RunMode) -> TidyResult<Self> {
        let parser = LinkParser::new(&layout.resources_dir)?;
        Ok(Self {
            layout,
            parser,
            mode,
        })
    }

    /// Run all four phases against the vault at `root`.
    ///
    /// Only an invalid root is an error; every per-file problem lands in the
    /// report and the run carries on.
    pub fn run(&self, root: &Path) -> TidyResult<OptimizeReport> {
        validate_root(root)?;

        let mut report = OptimizeReport {
            mode: self.mode,
            root: root.to_path_buf(),
            no_notes: false,
            references: Vec::new(),
            conflicts: Vec::new(),
            decisions: Vec::new(),
            relocations: Vec::new(),
            errors: Vec::new(),
            stats: OptimizeStats::default(),
        };

        let (notes, walk_errors) = collect_notes(root, &self.layout, true);
        report.errors = walk_errors;
        if notes.is_empty() {
            info!("No notes found in {}", root.display());
            report.no_notes = true;
            report.stats.errors = report.errors.len();
            return Ok(report);
        }

        info!("Phase 1: scanning {} note(s) for resource references", notes.len());
        let scan = build_reference_array(root, &notes, &self.parser, &self.layout);
        report.stats.notes_scanned = scan.notes_scanned;
        report.references = scan.references;
        // Phase 1 walks the same tree again; keep one entry per problem.
        for error in scan.errors {
            if !report.errors.contains(&error) {
                report.errors.push(error);
            }
        }

        info!("Phase 2: detecting conflicts");
        report.conflicts = detect_conflicts(&report.references);
        for conflict in &report.conflicts {
            warn!(
                "Resource {} has different content across {} reference(s); it will not be moved",
                conflict.name,
                conflict.references.len()
            );
        }

        info!("Phase 3: calculating optimal locations");
        let groups = group_by_resource(&report.references);
        let mut staging = MoveStaging::new(self.layout.hash_chunk_size);
        let decisions =
            plan_relocations(&groups, &report.conflicts, root, &self.layout, &mut staging);

        info!(
            "Phase 4: {} resources",
            if self.mode.is_execute() { "moving" } else { "simulating moves of" }
        );
        let applied = self.apply_plans(decisions);
        report.decisions = applied.decisions;
        report.relocations = applied.relocations;
        report.errors.extend(applied.errors);

        report.stats = tally(&report);
        Ok(report)
    }

    /// Phase 4: carry out (or simulate) every planned move, then rewrite each
    /// referencing note in a single pass over its original text.
    ///
    /// A failed move skips its notes; the remaining moves still run. An
    /// `Identical` plan whose notes already link correctly is reported as
    /// already optimal.
    fn apply_plans(&self, decisions: Vec<PlacementDecision>) -> AppliedPlans {
        let mut results = Vec::new();
        let mut note_lists = Vec::new();
        let mut pending: BTreeMap<PathBuf, Vec<PendingLink>> = BTreeMap::new();

        for decision in &decisions {
            let PlacementDecision::Relocate(relocation) = decision else {
                continue;
            };
            let outcome = if self.mode.is_execute() {
                apply_move(&relocation.plan)
            } else {
                relocation.plan.clone()
            };
            log_outcome(&outcome, self.mode.is_execute());

            if let Some(location) = outcome.final_location() {
                let old_name = relocation
                    .resource
                    .file_name()
                    .map(|v| v.to_string_lossy().into_owned())
                    .unwrap_or_default();
                for note in &relocation.notes {
                    pending.entry(note.clone()).or_default().push(PendingLink {
                        relocation: results.len(),
                        old_name: old_name.clone(),
                        link: note_relative_link(note, location, &self.layout.resources_dir),
                    });
                }
            }

            note_lists.push(relocation.notes.clone());
            results.push(RelocationResult {
                resource: relocation.resource.clone(),
                outcome,
                notes: Vec::new(),
            });
        }

        let mut updates: HashMap<(usize, PathBuf), NoteUpdate> = HashMap::new();
        for (note, links) in &pending {
            for (pending_link, status) in links.iter().zip(self.update_note(note, links)) {
                updates.insert(
                    (pending_link.relocation, note.clone()),
                    NoteUpdate {
                        note: note.clone(),
                        link: pending_link.link.clone(),
                        status,
                    },
                );
            }
        }
        for (index, (result, notes)) in results.iter_mut().zip(&note_lists).enumerate() {
            result.notes = notes
                .iter()
                .filter_map(|note| updates.remove(&(index, note.clone())))
                .collect();
        }

        let mut applied = AppliedPlans {
            decisions: Vec::with_capacity(decisions.len()),
            relocations: Vec::new(),
            errors: Vec::new(),
        };
        let mut results = results.into_iter();
        for decision in decisions {
            if !matches!(decision, PlacementDecision::Relocate(_)) {
                applied.decisions.push(decision);
                continue;
            }
            let Some(result) = results.next() else {
                continue;
            };
            if let Some(existing) = settled_in_place(&result) {
                info!("Already optimal: identical copy at {}", existing.display());
                applied
                    .decisions
                    .push(PlacementDecision::AlreadyOptimal { resource: existing });
                continue;
            }
            applied.errors.extend(result_errors(&result));
            applied.decisions.push(decision);
            applied.relocations.push(result);
        }
        applied
    }

    /// Apply every link change in `links` to `note` at once and return one
    /// status per link.
    ///
    /// A dry run reads the note and computes the new text without writing it.
    fn update_note(&self, note: &Path, links: &[PendingLink]) -> Vec<NoteUpdateStatus> {
        let raw = match read_note(note) {
            Ok(raw) => raw,
            Err(e) => {
                error!("{}", e);
                return links
                    .iter()
                    .map(|_| NoteUpdateStatus::Failed {
                        error: e.to_string(),
                    })
                    .collect();
            }
        };

        let mut statuses: Vec<NoteUpdateStatus> = links
            .iter()
            .map(|link| {
                if self.parser.rewrite_reference(&raw, &link.old_name, &link.link) != raw {
                    NoteUpdateStatus::Rewritten
                } else {
                    NoteUpdateStatus::Unchanged
                }
            })
            .collect();

        let renames: BTreeMap<String, String> = links
            .iter()
            .map(|link| (link.old_name.clone(), link.link.clone()))
            .collect();
        let updated = self.parser.rewrite_references(&raw, &renames);
        if updated == raw {
            return statuses;
        }

        if !self.mode.is_execute() {
            info!("Would update links in {}", note.display());
            return statuses;
        }
        match write_note(note, &updated) {
            Ok(()) => info!("Updated links in {}", note.display()),
            Err(e) => {
                error!("{}", e);
                for status in statuses
                    .iter_mut()
                    .filter(|status| **status == NoteUpdateStatus::Rewritten)
                {
                    *status = NoteUpdateStatus::Failed {
                        error: e.to_string(),
                    };
                }
            }
        }
        statuses
    }
}

/// The existing file at the optimal location when `result` changes nothing:
/// an identical copy is already there and every note already points at it.
fn settled_in_place(result: &RelocationResult) -> Option<PathBuf> {
    let MoveOutcome::Identical { existing, .. } = &result.outcome else {
        return None;
    };
    let untouched = !result.notes.is_empty()
        && result
            .notes
            .iter()
            .all(|update| update.status == NoteUpdateStatus::Unchanged);
    untouched.then(|| existing.clone())
}

fn result_errors(result: &RelocationResult) -> Vec<ReportedError> {
    let mut errors = Vec::new();
    if let MoveOutcome::Failed { from, error, .. } = &result.outcome {
        errors.push(ReportedError::new(ErrorKind::Move, from, error.clone()));
    }
    for update in &result.notes {
        if let NoteUpdateStatus::Failed { error } = &update.status {
            errors.push(ReportedError::new(ErrorKind::Write, &update.note, error.clone()));
        }
    }
    errors
}

fn tally(report: &OptimizeReport) -> OptimizeStats {
    let mut stats = OptimizeStats {
        notes_scanned: report.stats.notes_scanned,
        references: report.references.len(),
        missing: report.references.iter().filter(|r| r.is_missing()).count(),
        conflicting_references: report.references.iter().filter(|r| r.is_conflict()).count(),
        conflict_names: report.conflicts.len(),
        errors: report.errors.len(),
        ..OptimizeStats::default()
    };

    for decision in &report.decisions {
        match decision {
            PlacementDecision::AlreadyOptimal { .. } => stats.skipped_optimal += 1,
            PlacementDecision::SkippedConflict { .. } => stats.skipped_conflict += 1,
            PlacementDecision::Relocate(_) => {}
        }
    }

    for result in &report.relocations {
        match &result.outcome {
            MoveOutcome::Moved { .. } => stats.moved += 1,
            MoveOutcome::Renamed { .. } => stats.renamed += 1,
            MoveOutcome::Identical { .. } => stats.identical += 1,
            MoveOutcome::Missing { .. } | MoveOutcome::Failed { .. } => {}
        }
        for update in &result.notes {
            match update.status {
                NoteUpdateStatus::Rewritten => {
                    stats.notes_updated += 1;
                    stats.notes_touched += 1;
                }
                NoteUpdateStatus::Unchanged => stats.notes_touched += 1,
                NoteUpdateStatus::Failed { .. } => {}
            }
        }
    }

    stats
}
