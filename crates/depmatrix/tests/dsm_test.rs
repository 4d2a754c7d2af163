//! End-to-end tests over a small fixture package tree.

use std::path::Path;

use depmatrix::{
    Dsm, Finder, Matrix, PythonPathFinder, Render, RenderOptions, guess_depth,
};

fn fixture(rel: &str) -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(rel)
        .to_string_lossy()
        .into_owned()
}

fn internal_dsm() -> Dsm {
    Dsm::new(&[fixture("internal").as_str()])
}

const FULL_KEYS: [&str; 9] = [
    "internal.__init__",
    "internal.submodule1.__init__",
    "internal.submodule1.submoduleA.__init__",
    "internal.submodule1.submoduleA.test",
    "internal.submodule1.test",
    "internal.submodule2.__init__",
    "internal.submodule2.test",
    "internal.submodule2.test2",
    "internal.test",
];

#[test]
fn tree_layout() {
    let dsm = internal_dsm();
    assert!(!dsm.is_empty());
    assert!(dsm.not_found().is_empty());
    assert_eq!(dsm.root_packages().len(), 1);
    assert_eq!(dsm.submodules().len(), 9);

    let deep = dsm.get("internal.submodule1.submoduleA.test").unwrap();
    assert!(dsm.is_module(deep));
    assert_eq!(dsm.node_depth(deep), 4);
    assert_eq!(dsm.absolute_name(deep, 0), "internal.submodule1.submoduleA.test");
    assert_eq!(dsm.absolute_name(deep, 2), "internal.submodule1");

    assert!(dsm.get("internal.submodule1").is_some_and(|id| dsm.is_package(id)));
    assert!(dsm.get("internal.nosuchthing").is_none());
}

#[test]
fn display_names_the_packages() {
    let dsm = internal_dsm();
    assert_eq!(dsm.to_string(), "Dependency DSM for packages: [internal]");
}

#[test]
fn external_imports_are_flagged() {
    let dsm = internal_dsm();
    let module = dsm.get("internal.test").unwrap();
    let deps = dsm.dependencies(module);
    assert_eq!(deps.len(), 7);
    let externals: Vec<String> = deps
        .iter()
        .filter(|dep| dep.external())
        .map(|dep| dsm.describe(dep))
        .collect();
    assert_eq!(
        externals,
        [
            "test imports builtin (line 1)",
            "test imports external.exists.something (line 7)",
        ]
    );
}

#[test]
fn coarse_resolution_keeps_the_imported_name() {
    let dsm = internal_dsm();
    let module = dsm.get("internal.test").unwrap();
    let descriptions: Vec<String> = dsm
        .dependencies(module)
        .iter()
        .map(|dep| dsm.describe(dep))
        .collect();
    // A name that does not exist inside the package resolves coarsely
    // to the package, keeping what was imported for display.
    assert!(descriptions
        .contains(&"test imports doesnotexists from internal.submodule2 (line 6)".to_string()));
    // A relative self-import resolves to the module itself.
    assert!(descriptions.contains(&"test imports internal.test (line 5)".to_string()));
}

#[test]
fn full_depth_matrix() {
    let matrix = internal_dsm().as_matrix(0);
    assert_eq!(matrix.keys, FULL_KEYS);
    assert_eq!(
        matrix.data,
        [
            [0, 0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0, 9],
            [0, 1, 1, 2, 0, 0, 1, 0, 1],
            [0, 0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 1, 0, 0, 0, 0, 1, 0],
            [0, 0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 1, 1, 0, 2, 0, 0, 1],
        ]
    );
}

#[test]
fn depth_one_collapses_everything() {
    let matrix = internal_dsm().as_matrix(1);
    assert_eq!(matrix.keys, ["internal"]);
    assert_eq!(matrix.data, [[22]]);
}

#[test]
fn depth_two_aggregates_subtrees() {
    let matrix = internal_dsm().as_matrix(2);
    assert_eq!(
        matrix.keys,
        [
            "internal.__init__",
            "internal.submodule1",
            "internal.submodule2",
            "internal.test",
        ]
    );
    assert_eq!(
        matrix.data,
        [
            [0, 0, 0, 0],
            [0, 4, 1, 10],
            [0, 1, 1, 0],
            [0, 2, 2, 1],
        ]
    );
}

#[test]
fn total_is_preserved_across_depths() {
    let dsm = internal_dsm();
    for depth in [0, 1, 2, 3, 5, 100] {
        let matrix = dsm.as_matrix(depth);
        assert_eq!(matrix.total(), 22, "total changed at depth {depth}");
        assert_eq!(matrix.data.len(), matrix.keys.len());
        for row in &matrix.data {
            assert_eq!(row.len(), matrix.keys.len());
        }
    }
}

#[test]
fn repeated_projections_are_identical() {
    let dsm = internal_dsm();
    assert_eq!(dsm.as_matrix(2), dsm.as_matrix(2));
    assert_eq!(dsm.as_matrix(0), dsm.as_matrix(0));
}

#[test]
fn wide_from_import_counts_every_name() {
    let dsm = internal_dsm();
    let from = dsm.get("internal.submodule1.submoduleA.test").unwrap();
    let to = dsm.get("internal.test").unwrap();
    assert_eq!(dsm.cardinal(from, to), 9);
}

#[test]
fn containment_follows_the_tree() {
    let dsm = internal_dsm();
    let root = dsm.get("internal").unwrap();
    let deep = dsm.get("internal.submodule1.submoduleA.test").unwrap();
    let sibling = dsm.get("internal.submodule2").unwrap();
    assert!(dsm.node_contains(root, deep));
    assert!(!dsm.node_contains(sibling, deep));

    // A package and its __init__ module are the same import target.
    let init = dsm.get("internal.__init__").unwrap();
    assert!(dsm.node_contains(init, root));
    assert!(dsm.node_contains(root, init));
}

#[test]
fn graph_projection() {
    let dsm = internal_dsm();
    let graph = dsm.as_graph(2);
    assert_eq!(graph.vertex_count(), 4);
    assert_eq!(graph.edge_count(), 8);
    assert_eq!(graph.weight("internal.submodule1", "internal.test"), Some(10));
    assert_eq!(graph.weight("internal.test", "internal.submodule1"), Some(2));
    assert_eq!(graph.weight("internal.__init__", "internal.test"), None);

    let csv = graph.to_csv().unwrap();
    assert!(csv.starts_with("vertex_out,edge_weight,vertex_in\n"));
    assert!(csv.contains("internal.submodule1,10,internal.test\n"));
    assert!(csv.contains("internal.__init__,,\n"));
}

#[test]
fn treemap_renders_empty() {
    let dsm = internal_dsm();
    let treemap = dsm.as_treemap();
    assert!(treemap.to_text(&RenderOptions::default()).is_empty());
    assert!(treemap.to_csv().unwrap().is_empty());
    assert!(treemap.to_json(Some(2)).unwrap().is_empty());
}

#[test]
fn matrix_text_rendering() {
    let options = RenderOptions {
        zero: "∅".to_string(),
        ..RenderOptions::default()
    };
    let text = internal_dsm().as_matrix(1).to_text(&options);
    assert!(text.contains("Module"));
    assert!(text.contains("internal"));
    assert!(text.contains("22"));
    assert!(!text.contains('∅'));

    let full = internal_dsm().as_matrix(0).to_text(&options);
    assert!(full.contains('∅'));
    assert!(full.contains("internal.submodule1.submoduleA.test"));
}

#[test]
fn matrix_csv_rendering() {
    let csv = internal_dsm().as_matrix(2).to_csv().unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("module,internal.__init__,internal.submodule1,internal.submodule2,internal.test")
    );
    assert_eq!(lines.next(), Some("internal.__init__,0,0,0,0"));
    assert_eq!(lines.next(), Some("internal.submodule1,0,4,1,10"));
}

#[test]
fn matrix_json_round_trip() {
    let matrix = internal_dsm().as_matrix(2);
    let compact = matrix.to_json(None).unwrap();
    let back: Matrix = serde_json::from_str(&compact).unwrap();
    assert_eq!(back, matrix);
}

#[test]
fn dependency_list_text() {
    let dsm = internal_dsm();
    let text = dsm.to_text(&RenderOptions::default());
    assert!(text.starts_with("Dependency DSM for packages: [internal]\n"));
    assert!(text.contains("  internal\n"));
    assert!(text.contains("! test imports builtin (line 1)"));
    assert!(text.contains("test imports internal.submodule1.submoduleA.test (line 4)"));
}

#[test]
fn dependency_list_csv() {
    let dsm = internal_dsm();
    let csv = dsm.to_csv().unwrap();
    assert!(csv.starts_with("module,path,target,lineno,what,external\n"));
    assert!(csv.contains("internal.test,"));
    assert!(csv.contains(",builtin,1,,true\n"));
    assert!(csv.contains(",internal.submodule2,6,doesnotexists,false\n"));
}

#[test]
fn dependency_list_json() {
    let dsm = internal_dsm();
    let json = dsm.to_json(Some(2)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(
        value["name"],
        "Dependency DSM for packages: [internal]"
    );
    let packages = value["packages"].as_array().unwrap();
    assert_eq!(packages.len(), 1);
    assert_eq!(packages[0]["name"], "internal");
    let modules = packages[0]["modules"].as_array().unwrap();
    let test_module = modules
        .iter()
        .find(|module| module["name"] == "test")
        .unwrap();
    assert_eq!(test_module["dependencies"].as_array().unwrap().len(), 7);
}

#[test]
fn unreadable_sources_contribute_nothing() {
    let dsm = Dsm::new(&[fixture("broken").as_str()]);
    assert_eq!(dsm.submodules().len(), 3);
    let bad = dsm.get("broken.bad").unwrap();
    assert!(dsm.dependencies(bad).is_empty());

    let matrix = dsm.as_matrix(0);
    assert_eq!(matrix.keys, ["broken.__init__", "broken.bad", "broken.good"]);
    assert_eq!(matrix.total(), 1);
    let good = dsm.get("broken.good").unwrap();
    let to_bad = dsm.get("broken.bad").unwrap();
    assert_eq!(dsm.cardinal(good, to_bad), 1);
}

#[test]
fn greedy_mode_accepts_init_less_directories() {
    let strict = Dsm::new(&[fixture("noinit").as_str()]);
    assert!(strict.is_empty());
    assert_eq!(strict.not_found().len(), 1);

    let greedy = Dsm::with_options(&[fixture("noinit").as_str()], false);
    assert_eq!(greedy.submodules().len(), 2);
    assert_eq!(greedy.as_matrix(0).total(), 1);
}

#[test]
fn dotted_names_limit_the_tree() {
    let finder = Finder::new(vec![Box::new(PythonPathFinder::new(vec![
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures"),
    ]))]);

    let limited = Dsm::with_finder(&["internal.submodule1"], true, &finder);
    let mut names: Vec<String> = limited
        .submodules()
        .iter()
        .map(|&module| limited.absolute_name(module, 0))
        .collect();
    names.sort();
    assert_eq!(
        names,
        [
            "internal.submodule1.__init__",
            "internal.submodule1.submoduleA.__init__",
            "internal.submodule1.submoduleA.test",
            "internal.submodule1.test",
        ]
    );

    let both = Dsm::with_finder(
        &["internal.submodule1", "internal.submodule2"],
        true,
        &finder,
    );
    assert_eq!(both.submodules().len(), 7);
}

#[test]
fn single_module_dsm() {
    let dsm = Dsm::new(&[fixture("internal/test.py").as_str()]);
    assert_eq!(dsm.root_packages().len(), 0);
    assert_eq!(dsm.root_modules().len(), 1);

    // Only the relative self-import resolves; everything else is
    // external without the surrounding package.
    let matrix = dsm.as_matrix(0);
    assert_eq!(matrix.keys, ["test"]);
    assert_eq!(matrix.data, [[1]]);
}

#[test]
fn duplicate_arguments_collapse() {
    let path = fixture("internal");
    let dsm = Dsm::new(&[path.as_str(), path.as_str()]);
    assert_eq!(dsm.root_packages().len(), 1);
    assert_eq!(dsm.as_matrix(1).data, [[22]]);
}

#[test]
fn depth_guess_matches_argument_shape() {
    assert_eq!(guess_depth(&["internal".to_string()]), 2);
    assert_eq!(
        guess_depth(&["internal.submodule1".to_string(), "internal".to_string()]),
        1
    );
}
