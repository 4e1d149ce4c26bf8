//! Verification runs: walking the catalog against one site with gating.

mod report;
mod run;

pub use report::{ReportEntry, VerificationReport};
pub use run::VerificationRun;
