//! Tests for ReleaseTree: lineage queries and net change-sets
//!
//! Fixture (version(changes)):
//!
//! ```text
//! 11
//! └── 21(1)
//!     ├── 31(2,3,4)
//!     │   ├── 32(5,6,7,8)
//!     │   └── 33(5,6,7,10)
//!     ├── 22(5)
//!     │   └── 24(6,7)
//!     └── 23(10)
//! ```

use std::sync::Arc;
use std::thread;

use rstest::{fixture, rstest};

use reltree::domain::{ChangeItem, ChangePolicy, DomainError, ReleaseInput, ReleaseTree};
use reltree::util::testing;

fn ids(changes: &[ChangeItem]) -> Vec<&str> {
    changes.iter().map(ChangeItem::id).collect()
}

/// Four nodes built up front, the remaining four inserted from parallel threads.
#[fixture]
fn tree() -> Arc<ReleaseTree> {
    testing::init_test_setup();
    let tree = ReleaseTree::build(&[
        ReleaseInput::root("11", Vec::<&str>::new()),
        ReleaseInput::new("21", "11", ["1"]),
        ReleaseInput::new("31", "21", ["2", "3", "4"]),
        ReleaseInput::new("22", "21", ["5"]),
    ])
    .expect("build base tree");
    let tree = Arc::new(tree);

    let late = [
        ReleaseInput::new("32", "31", ["5", "6", "7", "8"]),
        ReleaseInput::new("33", "31", ["5", "6", "7", "10"]),
        ReleaseInput::new("24", "22", ["6", "7"]),
        ReleaseInput::new("23", "21", ["10"]),
    ];
    let handles: Vec<_> = late
        .into_iter()
        .map(|input| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || tree.insert_node(&input).expect("concurrent insert"))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    tree
}

#[rstest]
#[case("32", "24", &["2", "3", "4", "8"])]
#[case("33", "23", &["2", "3", "4", "5", "6", "7"])]
#[case("33", "21", &["2", "3", "4", "5", "6", "7", "10"])]
#[case("24", "11", &["1", "5", "6", "7"])]
fn given_fixture_tree_when_calc_changes_then_returns_net_set(
    tree: Arc<ReleaseTree>,
    #[case] end: &str,
    #[case] start: &str,
    #[case] expected: &[&str],
) {
    let changes = tree.calc_changes(end, start).expect("calc changes");
    assert_eq!(ids(&changes), expected);
}

#[rstest]
fn given_concurrent_inserts_when_done_then_all_nodes_are_linked(tree: Arc<ReleaseTree>) {
    assert_eq!(tree.len(), 8);
    assert_eq!(tree.read().iter().count(), 8);
    assert_eq!(tree.root().as_deref(), Some("11"));
}

#[rstest]
fn given_start_change_off_end_path_when_strict_then_names_the_change(tree: Arc<ReleaseTree>) {
    let err = tree.calc_changes("31", "22").unwrap_err();

    match err {
        DomainError::ChangeNotOnEndPath {
            change,
            node,
            start,
            end,
        } => {
            assert_eq!(change, "5");
            assert_eq!(node, "22");
            assert_eq!((start.as_str(), end.as_str()), ("22", "31"));
        }
        other => panic!("expected ChangeNotOnEndPath, got {other:?}"),
    }
}

#[rstest]
fn given_start_change_off_end_path_when_subtract_then_drops_it(tree: Arc<ReleaseTree>) {
    let changes = tree
        .calc_changes_with("31", "22", ChangePolicy::Subtract)
        .expect("calc changes");
    assert_eq!(ids(&changes), ["2", "3", "4"]);
}

#[rstest]
fn given_unknown_version_when_calc_changes_then_version_not_found(tree: Arc<ReleaseTree>) {
    let err = tree.calc_changes("32", "99").unwrap_err();
    assert_eq!(err, DomainError::VersionNotFound("99".to_string()));
}

#[rstest]
#[case("32", "24", "21")]
#[case("32", "33", "31")]
#[case("24", "11", "11")]
#[case("23", "24", "21")]
#[case("33", "33", "33")]
fn given_two_versions_when_find_lca_then_is_symmetric(
    tree: Arc<ReleaseTree>,
    #[case] a: &str,
    #[case] b: &str,
    #[case] expected: &str,
) {
    assert_eq!(tree.find_lca(a, b).expect("lca"), expected);
    assert_eq!(tree.find_lca(b, a).expect("lca"), expected);
}

#[rstest]
fn given_same_version_when_calc_changes_then_empty(tree: Arc<ReleaseTree>) {
    for version in ["11", "21", "32", "24"] {
        let changes = tree.calc_changes(version, version).expect("calc changes");
        assert!(changes.is_empty(), "{version} -> {version}: {changes:?}");
    }
}

#[rstest]
fn given_ancestor_as_start_when_calc_changes_then_collects_path_below_it(tree: Arc<ReleaseTree>) {
    let changes = tree.calc_changes("32", "21").expect("calc changes");
    assert_eq!(ids(&changes), ["2", "3", "4", "5", "6", "7", "8"]);
}

#[rstest]
fn given_descendant_as_start_when_subtract_then_empty(tree: Arc<ReleaseTree>) {
    let changes = tree
        .calc_changes_with("21", "33", ChangePolicy::Subtract)
        .expect("calc changes");
    assert!(changes.is_empty());
    assert!(tree.calc_changes("21", "33").is_err());
}

#[rstest]
fn given_tree_when_dumped_then_rebuild_from_dump_yields_same_dump(tree: Arc<ReleaseTree>) {
    let dump = tree.dump();
    assert_eq!(dump.node_count, 8);
    assert_eq!(dump.root, "11");
    assert_eq!(dump.node("31").map(|n| n.children.len()), Some(2));

    let inputs: Vec<ReleaseInput> = dump
        .nodes
        .iter()
        .map(|n| ReleaseInput::new(n.version.clone(), n.from_ver.clone(), n.changes.clone()))
        .collect();
    let rebuilt = ReleaseTree::build(&inputs).expect("rebuild from dump");

    let mut again = rebuilt.dump();
    let mut original = dump;
    for d in [&mut again, &mut original] {
        for node in &mut d.nodes {
            node.children.sort();
        }
    }
    assert_eq!(again, original);
}

#[rstest]
fn given_existing_version_when_inserting_then_rejected_and_tree_unchanged(tree: Arc<ReleaseTree>) {
    let before = tree.dump();

    let err = tree
        .insert_node(&ReleaseInput::new("32", "21", ["99"]))
        .unwrap_err();

    assert_eq!(err, DomainError::DuplicateVersion("32".to_string()));
    assert_eq!(tree.dump(), before);
}

#[rstest]
fn given_unknown_parent_when_inserting_then_rejected(tree: Arc<ReleaseTree>) {
    let err = tree
        .insert_node(&ReleaseInput::new("41", "40", ["11"]))
        .unwrap_err();

    assert_eq!(
        err,
        DomainError::ParentNotFound {
            version: "41".to_string(),
            parent: "40".to_string(),
        }
    );
    assert!(!tree.contains("41"));
}

#[rstest]
fn given_second_root_when_inserting_then_rejected(tree: Arc<ReleaseTree>) {
    let err = tree
        .insert_node(&ReleaseInput::root("12", ["x"]))
        .unwrap_err();
    assert!(matches!(err, DomainError::RootExists { .. }));
}

#[rstest]
fn given_tree_when_rendered_then_lists_every_version(tree: Arc<ReleaseTree>) {
    let text = tree.render();
    for version in ["11", "21", "22", "23", "24", "31", "32", "33"] {
        assert!(text.contains(version), "missing {version} in:\n{text}");
    }
}

#[test]
fn given_orphan_in_input_when_building_then_parent_not_found() {
    let result = ReleaseTree::build(&[
        ReleaseInput::root("11", ["a"]),
        ReleaseInput::new("31", "21", ["b"]),
    ]);

    assert!(matches!(
        result,
        Err(DomainError::ParentNotFound { ref parent, .. }) if parent == "21"
    ));
}

#[test]
fn given_duplicate_in_input_when_building_then_rejected() {
    let result = ReleaseTree::build(&[
        ReleaseInput::root("11", ["a"]),
        ReleaseInput::new("21", "11", ["b"]),
        ReleaseInput::new("21", "11", ["c"]),
    ]);

    assert_eq!(
        result.err(),
        Some(DomainError::DuplicateVersion("21".to_string()))
    );
}

#[test]
fn given_mixed_ids_when_calc_changes_then_numbers_first_in_numeric_order() {
    let tree = ReleaseTree::build(&[
        ReleaseInput::root("1.0", ["base"]),
        ReleaseInput::new("1.1", "1.0", ["PROJ-2", "10", "9", "PROJ-10"]),
    ])
    .expect("build");

    let changes = tree.calc_changes("1.1", "1.0").expect("calc changes");

    assert_eq!(ids(&changes), ["9", "10", "PROJ-10", "PROJ-2"]);
}

#[test]
fn given_empty_tree_when_querying_then_version_not_found() {
    let tree = ReleaseTree::new();
    assert!(tree.is_empty());
    assert_eq!(
        tree.find_lca("1", "2").unwrap_err(),
        DomainError::VersionNotFound("1".to_string())
    );
}
