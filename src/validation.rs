//! Input validation for app and task names.
//!
//! App names become the leftmost label of the deployment's host name and a key
//! in the progress store, so they are held to DNS label rules before any
//! request or file path is built from them.

use anyhow::{bail, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Maximum length of a DNS label.
pub const MAX_APP_NAME_LENGTH: usize = 63;

/// Maximum allowed length for task names.
pub const MAX_TASK_NAME_LENGTH: usize = 64;

fn app_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("app name pattern is valid")
    })
}

/// Validates that an app name is a lowercase DNS label.
///
/// # Examples
///
/// ```
/// use rajdhani::validation::validate_app_name;
///
/// assert!(validate_app_name("alice-rajdhani").is_ok());
/// assert!(validate_app_name("Alice").is_err());
/// assert!(validate_app_name("-alice").is_err());
/// ```
pub fn validate_app_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("App name cannot be empty");
    }

    if name.len() > MAX_APP_NAME_LENGTH {
        bail!(
            "App name too long: {} characters (max {})",
            name.len(),
            MAX_APP_NAME_LENGTH
        );
    }

    if !app_name_pattern().is_match(name) {
        bail!("App name '{name}' is invalid. Use lowercase letters, digits and dashes (-), starting and ending with a letter or digit");
    }

    Ok(())
}

/// Validates a task name from the catalog.
///
/// Task names are identifiers: ASCII letters, digits and underscores, not
/// starting with a digit.
pub fn validate_task_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("Task name cannot be empty");
    }

    if name.len() > MAX_TASK_NAME_LENGTH {
        bail!(
            "Task name too long: {} characters (max {})",
            name.len(),
            MAX_TASK_NAME_LENGTH
        );
    }

    let valid_chars = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_chars {
        bail!("Task name '{name}' contains invalid characters. Use only alphanumeric characters and underscores (_)");
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        bail!("Task name '{name}' cannot start with a digit");
    }

    Ok(())
}

/// Clap value parser for app name arguments.
pub fn clap_app_name_validator(s: &str) -> Result<String, String> {
    validate_app_name(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}
