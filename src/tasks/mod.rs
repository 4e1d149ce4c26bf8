//! Tasks: ordered milestones, each a group of checks.

mod catalog;

pub use catalog::{CatalogError, TaskCatalog};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::checks::{validate, Check, CheckStatus};
use crate::site::Site;

/// Aggregate outcome of a task.
///
/// A check that errored leaves the task unproven, so it counts as a failure here;
/// the individual check statuses keep the distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOutcome {
    Pass,
    Fail,
}

impl std::fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskOutcome::Pass => write!(f, "pass"),
            TaskOutcome::Fail => write!(f, "fail"),
        }
    }
}

/// Result of verifying one task: the outcome plus every check status in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status: TaskOutcome,
    pub checks: Vec<CheckStatus>,
}

impl TaskStatus {
    pub fn from_checks(checks: Vec<CheckStatus>) -> Self {
        let status = if checks.iter().all(CheckStatus::is_pass) {
            TaskOutcome::Pass
        } else {
            TaskOutcome::Fail
        };
        Self { status, checks }
    }

    pub fn is_pass(&self) -> bool {
        self.status == TaskOutcome::Pass
    }
}

/// A milestone: metadata plus the checks that prove it.
#[derive(Debug)]
pub struct Task {
    pub name: String,
    pub title: String,
    pub description: String,
    checks: Vec<Box<dyn Check>>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        checks: Vec<Box<dyn Check>>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: description.into(),
            checks,
        }
    }

    pub fn checks(&self) -> &[Box<dyn Check>] {
        &self.checks
    }

    /// Validate every check in order. A failing check does not stop the
    /// remaining ones; all diagnostics are collected.
    pub fn verify(&self, site: &Site) -> TaskStatus {
        info!(site = site.name(), task = %self.name, "verifying task");
        let results = self
            .checks
            .iter()
            .map(|check| validate(check.as_ref(), site))
            .collect();
        let status = TaskStatus::from_checks(results);
        info!(site = site.name(), task = %self.name, status = %status.status, "task verified");
        status
    }
}
