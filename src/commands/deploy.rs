//! Deploy an app from its latest commit, then verify and record it.

use anyhow::{Context, Result};
use colored::Colorize;

use super::verify::{prepare, record_report, run};
use crate::config::Config;
use crate::deploy::DeployClient;
use crate::validation::validate_app_name;

/// Execute the deploy command
///
/// The catalog is loaded before the deploy API is called, so a broken catalog
/// never triggers a deploy. A failed deploy aborts before any task is verified.
pub fn execute(config: &Config, app: &str, base_url: Option<&str>, json: bool) -> Result<()> {
    validate_app_name(app)?;
    let (catalog, site) = prepare(config, app, base_url)?;

    if !json {
        println!("{} Deploying '{}'...", "→".cyan().bold(), app);
    }
    DeployClient::from_config(config)?
        .sync_app(app)
        .with_context(|| format!("Failed to deploy '{app}'"))?;
    if !json {
        println!("{} Deployed\n", "✓".green().bold());
    }

    let report = run(&catalog, &site, json);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    }
    record_report(config, app, &report, json)
}
