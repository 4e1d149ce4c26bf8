//! List the task catalog in order.

use anyhow::Result;
use colored::Colorize;

use super::common::{ensure_catalog_exists, load_catalog};
use crate::config::Config;

/// Execute the tasks command
pub fn execute(config: &Config, verbose: bool) -> Result<()> {
    ensure_catalog_exists(&config.catalog)?;
    let catalog = load_catalog(config)?;

    println!("{}", "Tasks".bold().blue());
    println!("{}", "=".repeat(50));

    for (index, task) in catalog.iter().enumerate() {
        println!(
            "{:>3}. {} {}",
            index + 1,
            task.title.bold(),
            format!("({}, {} checks)", task.name, task.checks().len()).dimmed()
        );
        if verbose {
            for check in task.checks() {
                println!("       - {}", check.title());
            }
        }
    }

    println!();
    Ok(())
}
