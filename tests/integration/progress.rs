//! Recording verification reports in the progress store

use super::helpers::{load_catalog, site_for};
use mockito::Server;
use rajdhani::progress::{ChangeKind, ProgressStore};
use rajdhani::verify::VerificationRun;
use tempfile::TempDir;

const CATALOG: &str = r#"
name: homepage
title: Home Page
checks:
  - check_webpage_content:
      url: /
      expected_text: Search Trains
---
name: flags
title: Flags
checks:
  - check_flag:
      flag: login
---
name: payments
title: Payments
checks: [check_not_implemented]
"#;

#[test]
fn test_run_then_record() {
    let temp = TempDir::new().unwrap();
    let store = ProgressStore::new(temp.path().join("progress.toml"));
    store.create_app("student-app", "homepage").unwrap();

    let mut server = Server::new();
    server.mock("GET", "/").with_body("<h2>Search Trains</h2>").create();
    server
        .mock("GET", "/api/flags")
        .with_header("content-type", "application/json")
        .with_body(r#"{"login": true}"#)
        .create();

    let catalog = load_catalog(CATALOG);
    let site = site_for(&server);
    let report = VerificationRun::new(&catalog, &site).execute();
    assert_eq!(report.current_task(), "payments");

    let outcome = store.record("student-app", &report).unwrap();
    assert_eq!(outcome.score, 2);
    assert_eq!(outcome.current_task, "payments");
    assert_eq!(outcome.newly_completed, ["homepage", "flags"]);

    // Recording the same report again credits nothing new.
    let outcome = store.record("student-app", &report).unwrap();
    assert!(outcome.newly_completed.is_empty());
    assert_eq!(outcome.score, 2);

    let progress = store.get("student-app").unwrap().unwrap();
    let deploys = progress
        .changelog
        .iter()
        .filter(|c| c.kind == ChangeKind::Deploy)
        .count();
    assert_eq!(deploys, 2);
    assert_eq!(
        progress.recent_changes().next().map(|c| c.kind),
        Some(ChangeKind::Deploy)
    );
}

#[test]
fn test_progress_file_round_trips_through_disk() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("progress.toml");
    ProgressStore::new(&path).create_app("alice", "homepage").unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("alice"));
    assert!(content.contains("current_task = \"homepage\""));

    let reopened = ProgressStore::new(&path);
    assert_eq!(reopened.leaderboard().unwrap().len(), 1);
}
