//! Human-readable rendering of run reports.

use std::path::Path;

use vault_tidy_resources::paths::display_relative;
use vault_tidy_resources::{
    MoveOutcome, NoteSortOutcome, NoteUpdateStatus, OptimizeReport, PlacementDecision,
    YearSortReport,
};

const RULE: &str = "==================================================";

pub fn print_header(title: &str, root: &Path, execute: bool) {
    println!("{}", RULE);
    println!("{}", title);
    println!("Path: {}", root.display());
    println!(
        "Mode: {}",
        if execute { "EXECUTE" } else { "DRY RUN (use --execute to apply)" }
    );
    println!("{}", RULE);
}

fn outcome_line(outcome: &MoveOutcome, root: &Path, execute: bool) -> String {
    match outcome {
        MoveOutcome::Moved { from, to } => format!(
            "{} {} -> {}",
            if execute { "Moved" } else { "Would move" },
            display_relative(from, root),
            display_relative(to, root)
        ),
        MoveOutcome::Renamed { from, to, new_name } => format!(
            "{} {} -> {} (renamed to {})",
            if execute { "Moved" } else { "Would move" },
            display_relative(from, root),
            display_relative(to, root),
            new_name
        ),
        MoveOutcome::Identical { source, existing } => format!(
            "Identical: {} already at {}",
            display_relative(source, root),
            display_relative(existing, root)
        ),
        MoveOutcome::Missing { source } => {
            format!("Missing: {}", display_relative(source, root))
        }
        MoveOutcome::Failed { from, error, .. } => {
            format!("Error moving {}: {}", display_relative(from, root), error)
        }
    }
}

pub fn print_optimize(report: &OptimizeReport) {
    let root = report.root.as_path();
    let execute = report.mode.is_execute();
    print_header("Resource placement", root, execute);

    if report.no_notes {
        println!("No notes found.");
        return;
    }

    for conflict in &report.conflicts {
        println!("Conflict: {}", conflict.name);
        for path in conflict.resolved_paths() {
            println!("    {}", display_relative(path, root));
        }
    }
    for reference in report.references.iter().filter(|r| r.is_conflict()) {
        println!(
            "Conflict: {} in {}",
            reference.name,
            display_relative(&reference.note, root)
        );
    }
    for reference in report.references.iter().filter(|r| r.is_missing()) {
        println!(
            "Missing: {} in {}",
            reference.name,
            display_relative(&reference.note, root)
        );
    }

    for decision in &report.decisions {
        match decision {
            PlacementDecision::AlreadyOptimal { resource } => {
                println!("Skip (optimal): {}", display_relative(resource, root));
            }
            PlacementDecision::SkippedConflict { resource, .. } => {
                println!("Skip (conflict): {}", display_relative(resource, root));
            }
            PlacementDecision::Relocate(_) => {}
        }
    }

    for result in &report.relocations {
        println!("{}", outcome_line(&result.outcome, root, execute));
        for update in &result.notes {
            let state = match &update.status {
                NoteUpdateStatus::Rewritten => "updated".to_string(),
                NoteUpdateStatus::Unchanged => "unchanged".to_string(),
                NoteUpdateStatus::Failed { error } => format!("error: {}", error),
            };
            println!(
                "    {} -> [[{}]] ({})",
                display_relative(&update.note, root),
                update.link,
                state
            );
        }
    }

    let stats = &report.stats;
    println!("{}", RULE);
    println!("Summary:");
    println!("  Notes scanned:        {}", stats.notes_scanned);
    println!("  References:           {}", stats.references);
    println!("  Missing:              {}", stats.missing);
    println!("  Conflicting refs:     {}", stats.conflicting_references);
    println!("  Conflict names:       {}", stats.conflict_names);
    println!("  Moved:                {}", stats.moved);
    println!("  Renamed:              {}", stats.renamed);
    println!("  Identical:            {}", stats.identical);
    println!("  Already optimal:      {}", stats.skipped_optimal);
    println!("  Skipped (conflict):   {}", stats.skipped_conflict);
    println!("  Notes updated:        {}", stats.notes_updated);
    println!("  Notes touched:        {}", stats.notes_touched);
    println!("  Errors:               {}", stats.errors);
    println!("{}", RULE);
}

pub fn print_year_sort(report: &YearSortReport) {
    let root = report.root.as_path();
    let execute = report.mode.is_execute();
    print_header("Sort notes by year", root, execute);
    if let Some(resources) = &report.resources_dir {
        println!("Resources: {}", resources.display());
    }

    if report.no_notes {
        println!("No notes found.");
        return;
    }

    for entry in &report.notes {
        let note = display_relative(&entry.note, root);
        match &entry.outcome {
            NoteSortOutcome::Moved { to, year } => println!(
                "{} {} -> {} ({})",
                if execute { "Moved" } else { "Would move" },
                note,
                display_relative(to, root),
                year
            ),
            NoteSortOutcome::SkippedNoDate => println!("Skip (no date): {}", note),
            NoteSortOutcome::SkippedExists { target } => {
                println!("Skip (exists): {} at {}", note, display_relative(target, root))
            }
            NoteSortOutcome::Failed { error } => println!("Error: {}: {}", note, error),
        }
        for outcome in &entry.resources {
            println!("    {}", outcome_line(outcome, root, execute));
        }
    }

    let stats = &report.stats;
    println!("{}", RULE);
    println!("Summary:");
    println!("  Notes moved:          {}", stats.moved);
    println!("  Skipped (no date):    {}", stats.skipped_no_date);
    println!("  Skipped (exists):     {}", stats.skipped_exists);
    println!("  Resources moved:      {}", stats.resources_moved);
    println!("  Resources renamed:    {}", stats.resources_renamed);
    println!("  Resources missing:    {}", stats.resources_missing);
    println!("  Resources identical:  {}", stats.resources_identical);
    println!("  Errors:               {}", stats.errors);
    println!("{}", RULE);
}
