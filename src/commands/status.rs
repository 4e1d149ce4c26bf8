//! Leaderboard and per-app progress.

use anyhow::Result;
use colored::Colorize;

use super::common::{progress_store, truncate_for_display};
use crate::config::Config;
use crate::progress::{AppProgress, ChangeKind};

const CHANGELOG_LIMIT: usize = 20;

/// Show the leaderboard, or one app's progress when `app` is given
pub fn execute(config: &Config, app: Option<&str>) -> Result<()> {
    let store = progress_store(config);

    match app {
        Some(app) => match store.get(app)? {
            Some(progress) => display_app(app, &progress),
            None => anyhow::bail!("No progress recorded for app '{app}'"),
        },
        None => {
            let apps = store.leaderboard()?;
            if apps.is_empty() {
                println!("{}", "No apps registered yet.".dimmed());
                return Ok(());
            }
            println!("{}", "Leaderboard".bold().blue());
            println!("{}", "=".repeat(50));
            for (rank, (name, progress)) in apps.iter().enumerate() {
                println!(
                    "{:>3}. {:<24} {:>3}  {}",
                    rank + 1,
                    name.bold(),
                    progress.score,
                    progress.current_task.dimmed()
                );
            }
        }
    }

    println!();
    Ok(())
}

fn display_app(app: &str, progress: &AppProgress) {
    println!("{}", app.bold().blue());
    println!("{}", "=".repeat(50));
    println!("  Score:        {}", progress.score);
    println!("  Current task: {}", progress.current_task.yellow());
    println!(
        "  Last updated: {}",
        progress.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    );

    println!("\n{}", "Changelog".bold());
    for change in progress.recent_changes().take(CHANGELOG_LIMIT) {
        let kind = match change.kind {
            ChangeKind::TaskDone => change.kind.to_string().green(),
            ChangeKind::Deploy => change.kind.to_string().cyan(),
            ChangeKind::Created => change.kind.to_string().normal(),
        };
        println!(
            "  {} {:<10} {}",
            change.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            kind,
            truncate_for_display(&change.message, 60)
        );
    }
}
