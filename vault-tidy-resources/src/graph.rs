//! Reference graph: which notes use which resource files, and where each
//! resource should live.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use vault_tidy_core::LayoutSettings;

use crate::identity::{Fingerprint, fingerprint};
use crate::locator::find_many;
use crate::models::{
    Candidate, ConflictSet, ErrorKind, PlacementDecision, ReferenceGroup, Relocation,
    ReportedError, Resolution, ResourceReference,
};
use crate::mover::MoveStaging;
use crate::parser::{LinkParser, read_note};
use crate::paths::resource_location;

/// Output of phase 1.
#[derive(Debug, Clone, Default)]
pub struct ReferenceScan {
    pub notes_scanned: usize,
    pub references: Vec<ResourceReference>,
    pub errors: Vec<ReportedError>,
}

/// Phase 1: resolve every resource link in `notes` against files under `root`.
pub fn build_reference_array(
    root: &Path,
    notes: &[PathBuf],
    parser: &LinkParser,
    layout: &LayoutSettings,
) -> ReferenceScan {
    let mut scan = ReferenceScan {
        notes_scanned: notes.len(),
        ..ReferenceScan::default()
    };

    let mut links = Vec::new();
    for note in notes {
        let raw = match read_note(note) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{}", e);
                scan.errors
                    .push(ReportedError::new(ErrorKind::Read, note, e.to_string()));
                continue;
            }
        };
        let found = parser.extract_resource_links(&raw);
        debug!("{}: {} resource link(s)", note.display(), found.len());
        links.extend(found.into_iter().map(|link| (note, link)));
    }

    let names: BTreeSet<&str> = links.iter().map(|(_, link)| link.file_name()).collect();
    let (located, walk_errors) = find_many(names.iter().copied(), root);
    scan.errors.extend(walk_errors);
    let mut hashes = FingerprintMemo::new(layout.hash_chunk_size);

    for (note, link) in &links {
        let name = link.file_name();
        let candidates = located.get(name).map(Vec::as_slice).unwrap_or_default();

        let resolution = match candidates {
            [] => {
                warn!(
                    "Resource not found: {} (referenced in {})",
                    name,
                    note.display()
                );
                scan.errors.push(ReportedError::new(
                    ErrorKind::MissingResource,
                    *note,
                    format!("resource not found: {}", name),
                ));
                Resolution::Missing
            }
            [single] => Resolution::Resolved {
                path: single.clone(),
                fingerprint: hashes.get(single, &mut scan.errors),
            },
            many => {
                let candidates: Vec<Candidate> = many
                    .iter()
                    .map(|path| Candidate {
                        path: path.clone(),
                        fingerprint: hashes.get(path, &mut scan.errors),
                    })
                    .collect();
                let distinct: HashSet<&Fingerprint> = candidates
                    .iter()
                    .filter_map(|c| c.fingerprint.as_ref())
                    .collect();

                if distinct.len() == 1 {
                    let shared = distinct.into_iter().next().cloned();
                    Resolution::Resolved {
                        path: candidates[0].path.clone(),
                        fingerprint: shared,
                    }
                } else {
                    warn!(
                        "Multiple different files named {} (referenced in {}):",
                        name,
                        note.display()
                    );
                    for candidate in &candidates {
                        warn!(
                            "  - {} (hash: {})",
                            candidate.path.display(),
                            candidate
                                .fingerprint
                                .as_ref()
                                .map_or("N/A", Fingerprint::short)
                        );
                    }
                    scan.errors.push(ReportedError::new(
                        ErrorKind::Conflict,
                        *note,
                        format!("{} different files named {}", candidates.len(), name),
                    ));
                    Resolution::Conflict { candidates }
                }
            }
        };

        scan.references.push(ResourceReference {
            note: (*note).clone(),
            name: name.to_string(),
            target: link.target.clone(),
            resolution,
        });
    }

    scan
}

/// Per-run fingerprint cache; read failures are reported once per path.
struct FingerprintMemo {
    chunk_size: usize,
    known: HashMap<PathBuf, Option<Fingerprint>>,
}

impl FingerprintMemo {
    fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            known: HashMap::new(),
        }
    }

    fn get(&mut self, path: &Path, errors: &mut Vec<ReportedError>) -> Option<Fingerprint> {
        if let Some(known) = self.known.get(path) {
            return known.clone();
        }
        let digest = match fingerprint(path, self.chunk_size) {
            Ok(digest) => Some(digest),
            Err(e) => {
                warn!("{}", e);
                errors.push(ReportedError::new(ErrorKind::Read, path, e.to_string()));
                None
            }
        };
        self.known.insert(path.to_path_buf(), digest.clone());
        digest
    }
}

/// Phase 2: names whose resolved references disagree on content.
pub fn detect_conflicts(references: &[ResourceReference]) -> Vec<ConflictSet> {
    let mut by_name: BTreeMap<&str, Vec<&ResourceReference>> = BTreeMap::new();
    for reference in references {
        if reference.fingerprint().is_some() {
            by_name.entry(reference.name.as_str()).or_default().push(reference);
        }
    }

    by_name
        .into_iter()
        .filter(|(_, refs)| {
            let distinct: HashSet<&Fingerprint> =
                refs.iter().filter_map(|r| r.fingerprint()).collect();
            distinct.len() > 1
        })
        .map(|(name, refs)| ConflictSet {
            name: name.to_string(),
            references: refs.into_iter().cloned().collect(),
        })
        .collect()
}

/// Phase 3a: group resolved references by the file they point at.
pub fn group_by_resource(references: &[ResourceReference]) -> Vec<ReferenceGroup> {
    let mut groups: BTreeMap<&Path, ReferenceGroup> = BTreeMap::new();
    for reference in references {
        let Some(path) = reference.resolved_path() else {
            continue;
        };
        let group = groups.entry(path).or_insert_with(|| ReferenceGroup {
            resource: path.to_path_buf(),
            fingerprint: reference.fingerprint().cloned(),
            notes: Vec::new(),
        });
        if !group.notes.contains(&reference.note) {
            group.notes.push(reference.note.clone());
        }
    }
    groups.into_values().collect()
}

/// Deepest directory containing the parent directory of every note.
///
/// A single note yields its own directory. No notes, or notes with no common
/// ancestor, yield `base`.
pub fn lowest_common_ancestor(notes: &[PathBuf], base: &Path) -> PathBuf {
    let mut parents = notes.iter().filter_map(|note| note.parent());
    let Some(first) = parents.next() else {
        return base.to_path_buf();
    };

    let mut common: Vec<Component> = first.components().collect();
    for parent in parents {
        let shared = common
            .iter()
            .zip(parent.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        common.truncate(shared);
    }

    if common.is_empty() {
        return base.to_path_buf();
    }
    common.iter().collect()
}

/// Phase 3b: decide, for every group, whether and how its resource moves.
///
/// Moves are planned against `staging` so that suffix choices and collisions
/// account for the moves planned before them.
pub fn plan_relocations(
    groups: &[ReferenceGroup],
    conflicts: &[ConflictSet],
    root: &Path,
    layout: &LayoutSettings,
    staging: &mut MoveStaging,
) -> Vec<PlacementDecision> {
    let conflict_paths: HashSet<&Path> = conflicts
        .iter()
        .flat_map(|set| set.resolved_paths())
        .collect();

    let mut decisions = Vec::with_capacity(groups.len());
    for group in groups {
        let name = group
            .resource
            .file_name()
            .map(|v| v.to_string_lossy().into_owned())
            .unwrap_or_default();

        if conflict_paths.contains(group.resource.as_path()) {
            warn!("Skipping conflicting resource {}", group.resource.display());
            decisions.push(PlacementDecision::SkippedConflict {
                resource: group.resource.clone(),
                name,
            });
            continue;
        }

        let ancestor = lowest_common_ancestor(&group.notes, root);
        let optimal = resource_location(&ancestor, &layout.resources_dir, &name);

        if group.resource == optimal {
            info!("Already optimal: {}", group.resource.display());
            decisions.push(PlacementDecision::AlreadyOptimal {
                resource: group.resource.clone(),
            });
            continue;
        }

        let plan = staging.plan(&group.resource, &optimal);
        info!(
            "Planned: {} -> {} ({} note(s))",
            group.resource.display(),
            optimal.display(),
            group.notes.len()
        );
        decisions.push(PlacementDecision::Relocate(Relocation {
            resource: group.resource.clone(),
            destination: optimal,
            plan,
            notes: group.notes.clone(),
        }));
    }
    decisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, bytes: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    fn resolved(note: &str, name: &str, path: &str, digest: Option<&str>) -> ResourceReference {
        ResourceReference {
            note: PathBuf::from(note),
            name: name.to_string(),
            target: format!("_resources/{}", name),
            resolution: Resolution::Resolved {
                path: PathBuf::from(path),
                fingerprint: digest.map(Fingerprint::from_hex),
            },
        }
    }

    #[test]
    fn lca_of_single_note_is_its_directory() {
        let notes = vec![PathBuf::from("/vault/2023/a/note.md")];
        assert_eq!(
            lowest_common_ancestor(&notes, Path::new("/vault")),
            PathBuf::from("/vault/2023/a")
        );
    }

    #[test]
    fn lca_of_sibling_directories_is_their_parent() {
        let notes = vec![
            PathBuf::from("/vault/2023/a/one.md"),
            PathBuf::from("/vault/2023/b/two.md"),
            PathBuf::from("/vault/2023/b/c/three.md"),
        ];
        assert_eq!(
            lowest_common_ancestor(&notes, Path::new("/vault")),
            PathBuf::from("/vault/2023")
        );
    }

    #[test]
    fn lca_does_not_match_partial_names() {
        let notes = vec![
            PathBuf::from("/vault/2023/note.md"),
            PathBuf::from("/vault/20234/note.md"),
        ];
        assert_eq!(
            lowest_common_ancestor(&notes, Path::new("/base")),
            PathBuf::from("/vault")
        );
    }

    #[test]
    fn lca_without_common_root_falls_back_to_base() {
        let notes = vec![PathBuf::from("left/note.md"), PathBuf::from("/abs/note.md")];
        assert_eq!(
            lowest_common_ancestor(&notes, Path::new("/base")),
            PathBuf::from("/base")
        );
        assert_eq!(
            lowest_common_ancestor(&[], Path::new("/base")),
            PathBuf::from("/base")
        );
    }

    #[test]
    fn detect_conflicts_needs_two_distinct_digests() {
        let refs = vec![
            resolved("/v/a.md", "x.png", "/v/1/x.png", Some("aaaa")),
            resolved("/v/b.md", "x.png", "/v/2/x.png", Some("bbbb")),
            resolved("/v/c.md", "y.png", "/v/1/y.png", Some("cccc")),
            resolved("/v/d.md", "y.png", "/v/1/y.png", Some("cccc")),
            resolved("/v/e.md", "z.png", "/v/1/z.png", None),
        ];

        let conflicts = detect_conflicts(&refs);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].name, "x.png");
        assert_eq!(conflicts[0].references.len(), 2);
    }

    #[test]
    fn group_by_resource_dedups_notes_and_skips_unresolved() {
        let mut refs = vec![
            resolved("/v/a.md", "x.png", "/v/_resources/x.png", Some("aa")),
            resolved("/v/a.md", "x.png", "/v/_resources/x.png", Some("aa")),
            resolved("/v/b.md", "x.png", "/v/_resources/x.png", Some("aa")),
        ];
        refs.push(ResourceReference {
            resolution: Resolution::Missing,
            ..resolved("/v/c.md", "gone.png", "", None)
        });

        let groups = group_by_resource(&refs);
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].notes,
            vec![PathBuf::from("/v/a.md"), PathBuf::from("/v/b.md")]
        );
    }

    #[test]
    fn build_reference_array_resolves_all_cases() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("a/_resources/same.png"), b"same");
        write(&root.join("b/_resources/same.png"), b"same");
        write(&root.join("a/_resources/clash.png"), b"one");
        write(&root.join("b/_resources/clash.png"), b"two");
        write(&root.join("_resources/solo.pdf"), b"solo");
        let note = root.join("note.md");
        write(
            &note,
            b"![[_resources/same.png]] ![[_resources/clash.png]] [[_resources/solo.pdf]] ![[_resources/gone.gif]]",
        );

        let layout = LayoutSettings::default();
        let parser = LinkParser::new(&layout.resources_dir).unwrap();
        let scan = build_reference_array(root, &[note.clone()], &parser, &layout);

        assert_eq!(scan.notes_scanned, 1);
        assert_eq!(scan.references.len(), 4);

        let same = &scan.references[0];
        assert_eq!(same.resolved_path(), Some(root.join("a/_resources/same.png").as_path()));
        assert!(same.fingerprint().is_some());

        assert!(scan.references[1].is_conflict());
        assert_eq!(
            scan.references[2].resolved_path(),
            Some(root.join("_resources/solo.pdf").as_path())
        );
        assert!(scan.references[3].is_missing());

        let kinds: Vec<ErrorKind> = scan.errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::Conflict, ErrorKind::MissingResource]);
    }

    #[test]
    fn unreadable_note_is_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let bad = root.join("bad.md");
        write(&bad, &[0xff, 0xfe, 0xfd]);

        let layout = LayoutSettings::default();
        let parser = LinkParser::new(&layout.resources_dir).unwrap();
        let scan = build_reference_array(root, &[bad], &parser, &layout);

        assert!(scan.references.is_empty());
        assert_eq!(scan.errors.len(), 1);
        assert_eq!(scan.errors[0].kind, ErrorKind::Read);
    }

    #[test]
    fn plan_relocations_skips_conflicts_and_optimal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("2023/_resources/ok.png"), b"ok");
        write(&root.join("old/_resources/move.png"), b"move");

        let groups = vec![
            ReferenceGroup {
                resource: root.join("2023/_resources/ok.png"),
                fingerprint: None,
                notes: vec![root.join("2023/a.md")],
            },
            ReferenceGroup {
                resource: root.join("old/_resources/move.png"),
                fingerprint: None,
                notes: vec![root.join("2023/x/a.md"), root.join("2023/y/b.md")],
            },
            ReferenceGroup {
                resource: root.join("c/_resources/clash.png"),
                fingerprint: None,
                notes: vec![root.join("c/a.md")],
            },
        ];
        let conflicts = vec![ConflictSet {
            name: "clash.png".to_string(),
            references: vec![ResourceReference {
                note: root.join("c/a.md"),
                name: "clash.png".to_string(),
                target: "_resources/clash.png".to_string(),
                resolution: Resolution::Resolved {
                    path: root.join("c/_resources/clash.png"),
                    fingerprint: None,
                },
            }],
        }];

        let layout = LayoutSettings::default();
        let mut staging = MoveStaging::new(layout.hash_chunk_size);
        let decisions = plan_relocations(&groups, &conflicts, root, &layout, &mut staging);

        assert!(matches!(decisions[0], PlacementDecision::AlreadyOptimal { .. }));
        match &decisions[1] {
            PlacementDecision::Relocate(relocation) => {
                assert_eq!(relocation.destination, root.join("2023/_resources/move.png"));
                assert_eq!(relocation.notes.len(), 2);
            }
            other => panic!("unexpected decision {:?}", other),
        }
        assert!(matches!(
            decisions[2],
            PlacementDecision::SkippedConflict { .. }
        ));
    }
}
