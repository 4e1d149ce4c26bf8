//! Register a new app with the deploy API and the progress store.

use anyhow::{Context, Result};
use colored::Colorize;

use super::common::{ensure_catalog_exists, load_catalog, progress_store};
use crate::config::Config;
use crate::deploy::DeployClient;
use crate::validation::validate_app_name;

/// Execute the create command
pub fn execute(config: &Config, app: &str, git_url: &str) -> Result<()> {
    validate_app_name(app)?;
    ensure_catalog_exists(&config.catalog)?;
    let catalog = load_catalog(config)?;
    let first_task = catalog
        .names()
        .next()
        .context("Task catalog has no tasks")?
        .to_string();

    let store = progress_store(config);
    if store.get(app)?.is_some() {
        anyhow::bail!("App '{app}' already exists");
    }

    DeployClient::from_config(config)?
        .create_app(app, git_url)
        .with_context(|| format!("Failed to create app '{app}'"))?;
    store.create_app(app, &first_task)?;

    println!("{} Created new app {}", "✓".green().bold(), app.bold());
    println!("  Current task: {first_task}");
    Ok(())
}
