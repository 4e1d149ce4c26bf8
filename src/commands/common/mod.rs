//! Helpers shared across command implementations.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::checks::{CheckEnv, CheckRegistry, CheckStatus, Status};
use crate::config::Config;
use crate::progress::ProgressStore;
use crate::site::{Site, SiteOptions};
use crate::tasks::{Task, TaskCatalog, TaskStatus};
use crate::validation::validate_app_name;
use crate::verify::VerificationReport;

/// Load the task catalog named by the configuration.
pub fn load_catalog(config: &Config) -> Result<TaskCatalog> {
    TaskCatalog::load(
        &config.catalog,
        &CheckRegistry::builtin(),
        &CheckEnv::from(config),
    )
    .with_context(|| format!("Failed to load task catalog: {}", config.catalog.display()))
}

/// Bind a site for `app`, either at its configured address or at `base_url`.
pub fn build_site(app: &str, config: &Config, base_url: Option<&str>) -> Result<Site> {
    validate_app_name(app)?;
    let site = match base_url {
        Some(url) => Site::new(app, url, SiteOptions::from(config)),
        None => Site::for_app(app, config),
    };
    site.with_context(|| format!("Failed to set up site for app '{app}'"))
}

pub fn progress_store(config: &Config) -> ProgressStore {
    ProgressStore::new(config.progress_path())
}

/// Check that the catalog file exists before doing anything slow.
pub fn ensure_catalog_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!(
            "Task catalog not found: {} (set `catalog` in rajdhani.toml or pass --catalog)",
            path.display()
        );
    }
    Ok(())
}

/// Print one evaluated task and its checks.
pub fn print_task(task: &Task, status: &TaskStatus) {
    let mark = if status.is_pass() {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("{} {} {}", mark, task.title.bold(), format!("({})", task.name).dimmed());
    for check in &status.checks {
        print_check(check);
    }
}

fn print_check(check: &CheckStatus) {
    let mark = match check.status {
        Status::Pass => "✓".green(),
        Status::Fail => "✗".red(),
        Status::Error => "!".yellow(),
    };
    println!("    {} {}", mark, check.title);
    for line in check.message.lines() {
        println!("        {}", line.dimmed());
    }
}

/// Print the summary line for a finished run.
pub fn print_summary(report: &VerificationReport, total: usize) {
    let passed = report.passed_tasks().count();
    println!();
    if report.all_passed() && report.len() == total {
        println!("{} All {} tasks passed!", "✓".green().bold(), total);
    } else {
        println!(
            "{} {}/{} tasks passed | current task: {}",
            "Summary:".bold(),
            passed,
            total,
            report.current_task().yellow()
        );
    }
}

/// Collapse a message to one line and cut it to `max_len` characters.
pub fn truncate_for_display(s: &str, max_len: usize) -> String {
    let single_line = s.lines().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max_len {
        single_line
    } else {
        let truncated: String = single_line.chars().take(max_len.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}
