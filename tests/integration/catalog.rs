//! Loading catalogs from YAML files

use rajdhani::checks::{CheckEnv, CheckRegistry};
use rajdhani::tasks::{CatalogError, TaskCatalog};
use std::path::PathBuf;
use tempfile::TempDir;

fn shipped_catalog() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tasks.yml")
}

#[test]
fn test_shipped_catalog_loads() {
    let catalog = TaskCatalog::load(
        &shipped_catalog(),
        &CheckRegistry::builtin(),
        &CheckEnv::default(),
    )
    .unwrap();

    assert!(catalog.len() >= 5);
    assert_eq!(catalog.names().next(), Some("homepage"));
    for task in &catalog {
        assert!(!task.title.is_empty());
        assert!(!task.checks().is_empty(), "task {} has no checks", task.name);
    }
}

#[test]
fn test_both_layouts_produce_same_order() {
    let temp = TempDir::new().unwrap();
    let stream = temp.path().join("stream.yml");
    let sequence = temp.path().join("sequence.yml");
    std::fs::write(
        &stream,
        "name: a\ntitle: A\nchecks: [check_not_implemented]\n---\nname: b\ntitle: B\nchecks: [check_not_implemented]\n",
    )
    .unwrap();
    std::fs::write(
        &sequence,
        "- name: a\n  title: A\n  checks: [check_not_implemented]\n- name: b\n  title: B\n  checks: [check_not_implemented]\n",
    )
    .unwrap();

    let registry = CheckRegistry::builtin();
    let env = CheckEnv::default();
    let stream = TaskCatalog::load(&stream, &registry, &env).unwrap();
    let sequence = TaskCatalog::load(&sequence, &registry, &env).unwrap();
    assert_eq!(
        stream.names().collect::<Vec<_>>(),
        sequence.names().collect::<Vec<_>>()
    );
}

#[test]
fn test_restricted_registry_rejects_unregistered_kind() {
    let registry = CheckRegistry::default();
    let err = TaskCatalog::from_yaml(
        "name: a\ntitle: A\nchecks: [check_not_implemented]\n",
        &registry,
        &CheckEnv::default(),
    )
    .unwrap_err();
    let CatalogError::InTask { source, .. } = err else {
        panic!("expected task context");
    };
    assert!(matches!(*source, CatalogError::UnknownKind(ref kind) if kind == "check_not_implemented"));
}

#[test]
fn test_bad_arguments_are_rejected_at_load() {
    let err = TaskCatalog::from_yaml(
        r#"
name: search
title: Search
checks:
  - check_search_trains:
      from_station_code: MAS
      expected_trains: ["12007"]
      colour: blue
"#,
        &CheckRegistry::builtin(),
        &CheckEnv::default(),
    )
    .unwrap_err();
    let CatalogError::InTask { task, source } = err else {
        panic!("expected task context");
    };
    assert_eq!(task, "search");
    assert!(matches!(*source, CatalogError::InvalidArgs { .. }));
}

#[test]
fn test_invalid_yaml() {
    let err = TaskCatalog::from_yaml(
        "name: [unterminated\n",
        &CheckRegistry::builtin(),
        &CheckEnv::default(),
    )
    .unwrap_err();
    assert!(matches!(err, CatalogError::Yaml(_)));
}
