//! End-to-end runs of the resource optimizer against temporary vaults.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use vault_tidy_resources::{
    ErrorKind, LayoutSettings, MoveOutcome, NoteUpdateStatus, PlacementDecision,
    ResourceOptimizer, RunMode, TidyError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, bytes).expect("write");
}

fn optimizer(mode: RunMode) -> ResourceOptimizer {
    ResourceOptimizer::new(LayoutSettings::default(), mode).expect("optimizer")
}

/// Two notes in sibling folders under `2023/`, each with its own copy of the
/// same photo.
fn shared_photo_vault() -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(&root.join("2023/jan/_resources/photo.png"), b"same pixels");
    write(&root.join("2023/feb/_resources/photo.png"), b"same pixels");
    write(
        &root.join("2023/jan/ski.md"),
        b"# Ski\n\n![[_resources/photo.png|Slope]]\n",
    );
    write(
        &root.join("2023/feb/walk.md"),
        b"# Walk\n\nSee [[_resources/photo.png]] again.\n",
    );
    temp
}

#[test]
fn shared_resource_moves_to_common_ancestor() {
    init_tracing();
    let temp = shared_photo_vault();
    let root = temp.path();

    let report = optimizer(RunMode::Execute).run(root).expect("run");

    assert_eq!(report.stats.notes_scanned, 2);
    assert_eq!(report.stats.references, 2);
    assert_eq!(report.stats.moved, 1);
    assert_eq!(report.stats.notes_updated, 0);
    assert_eq!(report.stats.notes_touched, 2);
    assert_eq!(report.stats.errors, 0);

    assert_eq!(report.relocations.len(), 1);
    let relocation = &report.relocations[0];
    assert_eq!(
        relocation.outcome,
        MoveOutcome::Moved {
            from: root.join("2023/feb/_resources/photo.png"),
            to: root.join("2023/_resources/photo.png"),
        }
    );
    assert_eq!(relocation.notes.len(), 2);
    assert!(relocation.notes.iter().all(|n| n.link == "_resources/photo.png"));

    assert!(root.join("2023/_resources/photo.png").exists());
    assert!(!root.join("2023/feb/_resources/photo.png").exists());
    assert_eq!(
        fs::read_to_string(root.join("2023/jan/ski.md")).expect("read"),
        "# Ski\n\n![[_resources/photo.png|Slope]]\n"
    );
}

#[test]
fn second_run_is_a_no_op() {
    let temp = shared_photo_vault();
    let root = temp.path();

    optimizer(RunMode::Execute).run(root).expect("first run");
    let report = optimizer(RunMode::Execute).run(root).expect("second run");

    assert_eq!(report.stats.moved, 0);
    assert_eq!(report.stats.renamed, 0);
    assert_eq!(report.stats.notes_updated, 0);
    assert_eq!(report.stats.skipped_optimal, 1);
    assert!(report.relocations.is_empty());
}

#[test]
fn identical_copy_in_place_converges_to_already_optimal() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(&root.join("1999/_resources/p.png"), b"same");
    write(&root.join("2023/_resources/p.png"), b"same");
    write(&root.join("2023/a/n1.md"), b"![[_resources/p.png]]");
    write(&root.join("2023/b/n2.md"), b"![[_resources/p.png]]");

    let first = optimizer(RunMode::Execute).run(root).expect("first run");
    let second = optimizer(RunMode::Execute).run(root).expect("second run");

    for report in [&first, &second] {
        assert_eq!(report.stats.identical, 0);
        assert_eq!(report.stats.skipped_optimal, 1);
        assert_eq!(report.stats.notes_updated, 0);
        assert!(report.relocations.is_empty());
        assert_eq!(
            report.decisions,
            vec![PlacementDecision::AlreadyOptimal {
                resource: root.join("2023/_resources/p.png"),
            }]
        );
    }
    assert_eq!(first.stats, second.stats);
    assert!(root.join("1999/_resources/p.png").exists());
}

#[test]
fn failed_move_is_reported_and_other_moves_proceed() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(&root.join("_resources/a.png"), b"a");
    write(&root.join("_resources/b.png"), b"b");
    write(&root.join("2023/x.md"), b"![[_resources/a.png]]");
    write(&root.join("2024/y.md"), b"![[_resources/b.png]]");
    // A plain file where the resource folder should be created.
    write(&root.join("2023/_resources"), b"not a folder");

    let report = optimizer(RunMode::Execute).run(root).expect("run");

    assert_eq!(report.stats.moved, 1);
    assert_eq!(report.relocations.len(), 2);
    assert!(matches!(
        report.relocations[0].outcome,
        MoveOutcome::Failed { .. }
    ));
    assert!(report.relocations[0].notes.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ErrorKind::Move);
    assert_eq!(report.errors[0].path, root.join("_resources/a.png"));
    assert_eq!(report.stats.errors, 1);

    assert!(root.join("_resources/a.png").exists());
    assert!(root.join("2024/_resources/b.png").exists());
    assert!(!root.join("_resources/b.png").exists());
}

#[cfg(unix)]
#[test]
fn walk_errors_reach_the_report_once() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(&root.join("notes/_resources/a.png"), b"a");
    write(&root.join("notes/day.md"), b"![[_resources/a.png]]");
    std::os::unix::fs::symlink(root, root.join("notes/loop")).expect("symlink");

    let report = optimizer(RunMode::Execute).run(root).expect("run");

    assert_eq!(report.stats.notes_scanned, 1);
    assert_eq!(report.stats.skipped_optimal, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ErrorKind::Read);
    assert_eq!(report.errors[0].path, root.join("notes/loop"));
    assert_eq!(report.stats.errors, 1);
}

#[test]
fn dry_run_matches_execute_without_touching_disk() {
    let temp = shared_photo_vault();
    let root = temp.path();

    let dry = optimizer(RunMode::DryRun).run(root).expect("dry run");
    assert!(root.join("2023/feb/_resources/photo.png").exists());
    assert!(!root.join("2023/_resources").exists());
    assert_eq!(
        fs::read_to_string(root.join("2023/feb/walk.md")).expect("read"),
        "# Walk\n\nSee [[_resources/photo.png]] again.\n"
    );

    let executed = optimizer(RunMode::Execute).run(root).expect("execute");

    assert_eq!(dry.mode, RunMode::DryRun);
    assert_eq!(executed.mode, RunMode::Execute);
    assert_eq!(dry.decisions, executed.decisions);
    assert_eq!(dry.relocations, executed.relocations);
    assert_eq!(dry.stats, executed.stats);
}

#[test]
fn differing_content_is_a_conflict_and_never_moves() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(&root.join("a/_resources/photo.png"), b"beach");
    write(&root.join("b/_resources/photo.png"), b"mountain");
    write(&root.join("a/beach.md"), b"![[_resources/photo.png]]");
    write(&root.join("b/hike.md"), b"![[_resources/photo.png]]");

    let report = optimizer(RunMode::Execute).run(root).expect("run");

    assert_eq!(report.stats.conflicting_references, 2);
    assert_eq!(report.stats.missing, 0);
    assert_eq!(report.stats.moved, 0);
    assert!(report.references.iter().all(|r| r.is_conflict()));
    assert!(report.relocations.is_empty());
    assert_eq!(
        report
            .errors
            .iter()
            .filter(|e| e.kind == ErrorKind::Conflict)
            .count(),
        2
    );
    assert_eq!(fs::read(root.join("a/_resources/photo.png")).expect("read"), b"beach");
    assert_eq!(
        fs::read(root.join("b/_resources/photo.png")).expect("read"),
        b"mountain"
    );
}

#[test]
fn already_optimal_resource_stays_put() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(&root.join("2023/_resources/photo.png"), b"pixels");
    write(&root.join("2023/trip.md"), b"![[_resources/photo.png]]");

    let report = optimizer(RunMode::Execute).run(root).expect("run");

    assert_eq!(report.stats.moved, 0);
    assert_eq!(report.stats.notes_updated, 0);
    assert_eq!(report.stats.skipped_optimal, 1);
    assert_eq!(
        report.decisions,
        vec![PlacementDecision::AlreadyOptimal {
            resource: root.join("2023/_resources/photo.png"),
        }]
    );
}

#[test]
fn missing_resource_is_reported_and_run_continues() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(&root.join("_resources/kept.png"), b"kept");
    write(
        &root.join("notes/day.md"),
        b"![[_resources/ghost.png]] and ![[_resources/kept.png]]",
    );

    let report = optimizer(RunMode::Execute).run(root).expect("run");

    assert_eq!(report.stats.references, 2);
    assert_eq!(report.stats.missing, 1);
    assert_eq!(report.stats.moved, 1);
    assert!(
        report
            .errors
            .iter()
            .any(|e| e.kind == ErrorKind::MissingResource && e.path == root.join("notes/day.md"))
    );
    assert!(root.join("notes/_resources/kept.png").exists());
}

#[test]
fn folder_prefixed_links_are_rewritten() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(&root.join("_resources/scan.pdf"), b"%PDF");
    let note = root.join("work/report.md");
    write(&note, b"![[../_resources/scan.pdf#page=2|Scan]]");

    let report = optimizer(RunMode::Execute).run(root).expect("run");

    assert_eq!(report.stats.moved, 1);
    assert_eq!(
        report.relocations[0].notes[0].status,
        NoteUpdateStatus::Rewritten
    );
    assert_eq!(
        fs::read_to_string(&note).expect("read"),
        "![[_resources/scan.pdf#page=2|Scan]]"
    );
}

#[test]
fn invalid_root_and_empty_vault() {
    let temp = TempDir::new().expect("tempdir");
    let file = temp.path().join("file.md");
    write(&file, b"x");

    assert!(matches!(
        optimizer(RunMode::DryRun).run(&temp.path().join("absent")),
        Err(TidyError::RootNotFound(_))
    ));
    assert!(matches!(
        optimizer(RunMode::DryRun).run(&file),
        Err(TidyError::RootNotDirectory(_))
    ));

    let empty = TempDir::new().expect("tempdir");
    let report = optimizer(RunMode::DryRun).run(empty.path()).expect("run");
    assert!(report.no_notes);
}

#[test]
fn report_serializes_with_tagged_outcomes() {
    let temp = shared_photo_vault();
    let report = optimizer(RunMode::DryRun).run(temp.path()).expect("run");

    let json = serde_json::to_value(&report).expect("json");
    assert_eq!(json["mode"], "dry_run");
    assert_eq!(json["relocations"][0]["outcome"]["kind"], "moved");
    assert_eq!(json["stats"]["moved"], 1);
}
