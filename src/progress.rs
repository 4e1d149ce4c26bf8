//! Per-app progress: completed tasks, score and changelog.
//!
//! Progress lives in `<state_dir>/progress.toml`. Every update is a single
//! read-modify-write under an exclusive `fs2` lock, so concurrent `record`
//! calls for different apps cannot lose each other's writes.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::verify::VerificationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    Created,
    Deploy,
    TaskDone,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Created => write!(f, "created"),
            ChangeKind::Deploy => write!(f, "deploy"),
            ChangeKind::TaskDone => write!(f, "task-done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Recorded progress of one app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppProgress {
    pub current_task: String,
    /// Number of distinct tasks ever completed. Never decreases.
    pub score: usize,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Completed task name to the time it was first completed.
    #[serde(default)]
    pub completed: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub changelog: Vec<ChangelogEntry>,
}

impl AppProgress {
    fn new(current_task: &str, now: DateTime<Utc>) -> Self {
        Self {
            current_task: current_task.to_string(),
            score: 0,
            created: now,
            last_updated: now,
            completed: BTreeMap::new(),
            changelog: vec![ChangelogEntry {
                kind: ChangeKind::Created,
                message: "Created the app".to_string(),
                timestamp: now,
            }],
        }
    }

    pub fn is_task_done(&self, task: &str) -> bool {
        self.completed.contains_key(task)
    }

    /// Changelog with the most recent entry first.
    pub fn recent_changes(&self) -> impl Iterator<Item = &ChangelogEntry> {
        self.changelog.iter().rev()
    }

    fn log(&mut self, kind: ChangeKind, message: String, now: DateTime<Utc>) {
        self.changelog.push(ChangelogEntry {
            kind,
            message,
            timestamp: now,
        });
    }
}

/// Contents of `progress.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub apps: BTreeMap<String, AppProgress>,
}

/// What a recorded report changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub current_task: String,
    pub score: usize,
    /// Tasks credited for the first time by this report.
    pub newly_completed: Vec<String>,
}

/// File-backed store of [`AppProgress`] records.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all progress. A missing file is an empty store.
    pub fn load(&self) -> Result<Progress> {
        if !self.path.exists() {
            return Ok(Progress::default());
        }
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open progress file: {}", self.path.display()))?;
        file.lock_shared()
            .with_context(|| format!("Failed to acquire shared lock: {}", self.path.display()))?;
        let content = read_all(&file, &self.path)?;
        parse(&content, &self.path)
    }

    pub fn get(&self, app: &str) -> Result<Option<AppProgress>> {
        Ok(self.load()?.apps.remove(app))
    }

    /// Register a new app starting at `first_task`.
    pub fn create_app(&self, app: &str, first_task: &str) -> Result<AppProgress> {
        self.update(|progress| {
            if progress.apps.contains_key(app) {
                bail!("App '{app}' already exists");
            }
            let record = AppProgress::new(first_task, Utc::now());
            progress.apps.insert(app.to_string(), record.clone());
            info!(app, first_task, "registered app");
            Ok(record)
        })
    }

    /// Record the outcome of a verification run.
    ///
    /// Adds a `deploy` changelog entry, moves the current task to the report's
    /// frontier and credits newly passed tasks. Tasks credited earlier stay
    /// credited even when this report does not cover them. Unknown apps are
    /// registered on first record.
    pub fn record(&self, app: &str, report: &VerificationReport) -> Result<RecordOutcome> {
        self.update(|progress| {
            let now = Utc::now();
            let entry = progress
                .apps
                .entry(app.to_string())
                .or_insert_with(|| AppProgress::new(report.current_task(), now));

            entry.log(ChangeKind::Deploy, "Deployed the app".to_string(), now);
            entry.current_task = report.current_task().to_string();

            let mut newly_completed = Vec::new();
            for task in report.passed_tasks() {
                if !entry.is_task_done(task) {
                    entry.completed.insert(task.to_string(), now);
                    entry.log(ChangeKind::TaskDone, format!("Completed task {task}."), now);
                    newly_completed.push(task.to_string());
                }
            }

            entry.score = entry.completed.len();
            entry.last_updated = now;
            info!(app, score = entry.score, current_task = %entry.current_task, "recorded progress");

            Ok(RecordOutcome {
                current_task: entry.current_task.clone(),
                score: entry.score,
                newly_completed,
            })
        })
    }

    /// Apps ordered by score, highest first; ties by name.
    pub fn leaderboard(&self) -> Result<Vec<(String, AppProgress)>> {
        let mut apps: Vec<_> = self.load()?.apps.into_iter().collect();
        apps.sort_by(|(a_name, a), (b_name, b)| b.score.cmp(&a.score).then_with(|| a_name.cmp(b_name)));
        Ok(apps)
    }

    /// Read, modify and write the store while holding an exclusive lock.
    ///
    /// Nothing is written when `f` fails.
    fn update<T>(&self, f: impl FnOnce(&mut Progress) -> Result<T>) -> Result<T> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory: {}", parent.display()))?;
        }

        #[allow(clippy::suspicious_open_options)]
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open progress file: {}", self.path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to acquire exclusive lock: {}", self.path.display()))?;

        let content = read_all(&file, &self.path)?;
        let mut progress = parse(&content, &self.path)?;
        let result = f(&mut progress)?;

        let serialized =
            toml::to_string_pretty(&progress).context("Failed to serialize progress to TOML")?;
        file.set_len(0)
            .with_context(|| format!("Failed to truncate file: {}", self.path.display()))?;
        file.seek(SeekFrom::Start(0))
            .with_context(|| format!("Failed to rewind file: {}", self.path.display()))?;
        file.write_all(serialized.as_bytes())
            .with_context(|| format!("Failed to write progress file: {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("Failed to flush file: {}", self.path.display()))?;

        Ok(result)
    }
}

fn read_all(mut file: &File, path: &Path) -> Result<String> {
    let mut content = String::new();
    file.read_to_string(&mut content)
        .with_context(|| format!("Failed to read progress file: {}", path.display()))?;
    Ok(content)
}

fn parse(content: &str, path: &Path) -> Result<Progress> {
    if content.trim().is_empty() {
        return Ok(Progress::default());
    }
    toml::from_str(content)
        .with_context(|| format!("Failed to parse progress file: {}", path.display()))
}
