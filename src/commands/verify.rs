//! Verify an app against the task catalog.

use anyhow::{Context, Result};
use colored::Colorize;

use super::common::{
    build_site, ensure_catalog_exists, load_catalog, print_summary, print_task, progress_store,
};
use crate::config::Config;
use crate::site::Site;
use crate::tasks::TaskCatalog;
use crate::verify::{VerificationReport, VerificationRun};

/// Execute the verify command
pub fn execute(config: &Config, app: &str, base_url: Option<&str>, json: bool, record: bool) -> Result<()> {
    let (catalog, site) = prepare(config, app, base_url)?;
    let report = run(&catalog, &site, json);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    }

    if record {
        record_report(config, app, &report, json)?;
    }
    Ok(())
}

/// Load the catalog and bind the site. Fails before anything touches the app.
pub(crate) fn prepare(
    config: &Config,
    app: &str,
    base_url: Option<&str>,
) -> Result<(TaskCatalog, Site)> {
    ensure_catalog_exists(&config.catalog)?;
    let catalog = load_catalog(config)?;
    let site = build_site(app, config, base_url)?;
    Ok((catalog, site))
}

/// Verify `site` against `catalog`, printing each task as it is evaluated unless `quiet`.
pub(crate) fn run(catalog: &TaskCatalog, site: &Site, quiet: bool) -> VerificationReport {
    if !quiet {
        println!(
            "{} Verifying '{}' at {}\n",
            "→".cyan().bold(),
            site.name(),
            site.base_url()
        );
    }

    let report = VerificationRun::new(catalog, site).execute_with(|task, status| {
        if !quiet {
            print_task(task, status);
        }
    });

    if !quiet {
        print_summary(&report, catalog.len());
    }
    report
}

pub(crate) fn record_report(
    config: &Config,
    app: &str,
    report: &VerificationReport,
    quiet: bool,
) -> Result<()> {
    let outcome = progress_store(config)
        .record(app, report)
        .with_context(|| format!("Failed to record progress for '{app}'"))?;

    if !quiet {
        for task in &outcome.newly_completed {
            println!("{} Completed task {}", "★".yellow().bold(), task.bold());
        }
        println!(
            "{} score {} | current task: {}",
            "Recorded:".bold(),
            outcome.score,
            outcome.current_task
        );
    }
    Ok(())
}
