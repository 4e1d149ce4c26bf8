//! The outcome of one verification run.

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::tasks::TaskStatus;

/// Status of one evaluated task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub status: TaskStatus,
}

/// Statuses of the evaluated prefix of the catalog, in evaluation order,
/// plus the task where evaluation stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    entries: Vec<ReportEntry>,
}

impl VerificationReport {
    pub fn new(entries: Vec<ReportEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TaskStatus> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.status)
    }

    /// The first task that did not pass, or the last task if all passed.
    ///
    /// Both are the last evaluated entry, since evaluation stops at the
    /// first non-passing task.
    pub fn current_task(&self) -> &str {
        self.entries
            .last()
            .map(|entry| entry.name.as_str())
            .unwrap_or_default()
    }

    /// Names of the tasks that passed in this run, in order.
    pub fn passed_tasks(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| entry.status.is_pass())
            .map(|entry| entry.name.as_str())
    }

    /// True when every evaluated task passed.
    pub fn all_passed(&self) -> bool {
        self.entries.iter().all(|entry| entry.status.is_pass())
    }
}

struct OrderedTasks<'a>(&'a [ReportEntry]);

impl Serialize for OrderedTasks<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|entry| (&entry.name, &entry.status)))
    }
}

impl Serialize for VerificationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut report = serializer.serialize_struct("VerificationReport", 2)?;
        report.serialize_field("tasks", &OrderedTasks(&self.entries))?;
        report.serialize_field("current_task", self.current_task())?;
        report.end()
    }
}
