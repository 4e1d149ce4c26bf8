//! The gating state machine over an ordered catalog.

use tracing::info;

use super::report::{ReportEntry, VerificationReport};
use crate::site::Site;
use crate::tasks::{Task, TaskCatalog, TaskStatus};

/// One verification of a catalog against a site.
///
/// Tasks are evaluated strictly in catalog order. Evaluation stops at the
/// first task that does not pass; later tasks are never probed and do not
/// appear in the report.
#[derive(Debug, Clone, Copy)]
pub struct VerificationRun<'a> {
    catalog: &'a TaskCatalog,
    site: &'a Site,
}

impl<'a> VerificationRun<'a> {
    pub fn new(catalog: &'a TaskCatalog, site: &'a Site) -> Self {
        Self { catalog, site }
    }

    pub fn execute(&self) -> VerificationReport {
        self.execute_with(|_, _| {})
    }

    /// Run the catalog, calling `on_task` after each task is evaluated.
    pub fn execute_with(&self, mut on_task: impl FnMut(&Task, &TaskStatus)) -> VerificationReport {
        info!(site = self.site.name(), tasks = self.catalog.len(), "starting verification run");

        let mut entries = Vec::new();
        for task in self.catalog {
            let status = task.verify(self.site);
            on_task(task, &status);
            let passed = status.is_pass();
            entries.push(ReportEntry {
                name: task.name.clone(),
                status,
            });
            if !passed {
                break;
            }
        }

        let report = VerificationReport::new(entries);
        info!(
            site = self.site.name(),
            evaluated = report.len(),
            current_task = report.current_task(),
            "verification run finished"
        );
        report
    }
}
