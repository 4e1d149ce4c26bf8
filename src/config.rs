//! Layered harness configuration.
//!
//! Built-in defaults, then a `rajdhani.toml` file, then `RAJDHANI_*`
//! environment overrides. Command-line flags are applied last by the caller.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::mail::MailWait;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "rajdhani.toml";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "RAJDHANI_CONFIG";

const DOMAIN_ENV: &str = "RAJDHANI_DOMAIN";
const DEPLOY_URL_ENV: &str = "RAJDHANI_DEPLOY_URL";
const MAIL_FILE_ENV: &str = "RAJDHANI_MAIL_FILE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Apps are served at `<scheme>://<app>.<domain>`.
    pub domain: String,
    pub scheme: String,
    /// Base URL of the deploy-trigger API.
    pub deploy_url: String,
    /// YAML task catalog.
    pub catalog: PathBuf,
    /// File the mail-capture sink writes the latest message to.
    pub mail_file: PathBuf,
    /// Directory holding `progress.toml`.
    pub state_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// How long the email check waits for the confirmation mail.
    pub email_wait_secs: u64,
    pub email_poll_interval_ms: u64,
    pub login_path: String,
    pub explorer_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: "rajdhani.pipal.in".to_string(),
            scheme: "https".to_string(),
            deploy_url: "https://hamr.rajdhani.pipal.in".to_string(),
            catalog: PathBuf::from("tasks.yml"),
            mail_file: PathBuf::from("rajdhani.mail"),
            state_dir: PathBuf::from(".rajdhani"),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            email_wait_secs: 10,
            email_poll_interval_ms: 250,
            login_path: "/login".to_string(),
            explorer_path: "/data-explorer".to_string(),
        }
    }
}

impl Config {
    /// Load configuration, honouring an explicit file if given.
    ///
    /// Without an explicit file, `RAJDHANI_CONFIG`, then `./rajdhani.toml`, then
    /// `<config dir>/rajdhani/config.toml` are tried; if none exists the
    /// defaults are used. Environment overrides are applied in every case.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                Self::from_file(&path)?
            }
            None => match Self::discover() {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env();
        Ok(config)
    }

    /// Parse a configuration file. A file that exists but does not parse is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration content (for testing without file system)
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("rajdhani").join("config.toml"))
            .filter(|path| path.exists())
    }

    /// Apply `RAJDHANI_*` environment overrides. Empty values are ignored.
    pub fn apply_env(&mut self) {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(domain) = var(DOMAIN_ENV) {
            self.domain = domain;
        }
        if let Some(url) = var(DEPLOY_URL_ENV) {
            self.deploy_url = url;
        }
        if let Some(path) = var(MAIL_FILE_ENV) {
            self.mail_file = PathBuf::from(path);
        }
    }

    pub fn mail_wait(&self) -> MailWait {
        MailWait {
            timeout: Duration::from_secs(self.email_wait_secs),
            // A zero interval would spin.
            interval: Duration::from_millis(self.email_poll_interval_ms.max(10)),
        }
    }

    pub fn progress_path(&self) -> PathBuf {
        self.state_dir.join("progress.toml")
    }
}
