//! Client for the deploy-trigger API.
//!
//! The API creates an app from a git repository and (re)deploys it from the
//! latest commit. Calls are made once; a rejected call is reported to the
//! caller and never retried.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::site::USER_AGENT;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("request to deploy API failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{action} Request to deploy API failed with status code {}{detail}", .status.as_u16())]
    Rejected {
        action: DeployAction,
        status: StatusCode,
        /// Preformatted `status:`/`message:` lines, empty when the body was not JSON.
        detail: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployAction {
    Create,
    Deploy,
}

impl fmt::Display for DeployAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployAction::Create => write!(f, "Create"),
            DeployAction::Deploy => write!(f, "Deploy"),
        }
    }
}

/// Error body returned by the deploy API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    status: serde_json::Value,
    #[serde(default)]
    message: String,
}

impl ErrorBody {
    fn detail(body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(error) => {
                let status = match error.status {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                format!("\nstatus: {status}\nmessage: {}", error.message)
            }
            Err(_) => String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeployClient {
    base_url: String,
    client: Client,
}

impl DeployClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DeployError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, DeployError> {
        Self::new(
            &config.deploy_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Register a new app built from `git_url`.
    pub fn create_app(&self, app_name: &str, git_url: &str) -> Result<(), DeployError> {
        let url = format!("{}/apps/create", self.base_url);
        info!(app = app_name, %url, "creating app");
        let response = self
            .client
            .post(&url)
            .form(&[("app_name", app_name), ("git_url", git_url)])
            .send()?;
        Self::check(DeployAction::Create, response)
    }

    /// Redeploy an existing app from its latest commit.
    pub fn sync_app(&self, app_name: &str) -> Result<(), DeployError> {
        let url = format!("{}/apps/{}/deploy", self.base_url, app_name);
        info!(app = app_name, %url, "deploying app");
        let response = self.client.post(&url).send()?;
        Self::check(DeployAction::Deploy, response)
    }

    fn check(action: DeployAction, response: reqwest::blocking::Response) -> Result<(), DeployError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(DeployError::Rejected {
            action,
            status,
            detail: ErrorBody::detail(&body),
        })
    }
}
