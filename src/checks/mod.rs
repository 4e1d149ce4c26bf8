//! Checks: single assertions against a deployed app.
//!
//! A check body returns `Ok(())` when the assertion holds,
//! [`CheckError::Failed`] when the app answered but the assertion did not
//! hold, and any other [`CheckError`] when the harness could not find out.
//! [`validate`] is the only place those outcomes become a [`CheckStatus`].

mod args;
mod booking;
mod content;
mod registry;
mod search;
mod stations;

pub use booking::{BookingConfirmationEmail, BookingRequest, BookingSideEffect, TripListing};
pub use content::{FeatureFlag, NotImplemented, WebpageContent};
pub use registry::{CheckRegistry, Constructor};
pub use search::{SearchTrains, TrainSchedule, ALLOWED_SEARCH_KEYS};
pub use stations::Autocomplete;

use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

use crate::config::Config;
use crate::mail::{MailError, MailWait};
use crate::site::{Site, SiteError};

/// Why a check body did not pass.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The app was reachable and answered, but not as required.
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Site(#[from] SiteError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("{0}")]
    Harness(String),
}

impl CheckError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    /// The assertion was evaluated and did not hold.
    Fail,
    /// The check could not complete; its truth value is unknown.
    Error,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Pass => write!(f, "pass"),
            Status::Fail => write!(f, "fail"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// Result of validating one check: its title, status and (unless passing) a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStatus {
    pub title: String,
    pub status: Status,
    #[serde(default)]
    pub message: String,
}

impl CheckStatus {
    pub fn pass(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: Status::Pass,
            message: String::new(),
        }
    }

    pub fn fail(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: Status::Fail,
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: Status::Error,
            message: message.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.status == Status::Pass
    }
}

/// A testable assertion about a [`Site`].
///
/// Implementations are immutable after construction; everything produced by
/// one attempt lives in the returned status.
pub trait Check: std::fmt::Debug {
    /// Human label shown in reports.
    fn title(&self) -> &str;

    /// Evaluate the assertion.
    fn run(&self, site: &Site) -> Result<(), CheckError>;
}

/// Run `check` against `site` and classify the outcome.
///
/// Never panics outward: a panic inside the check body is reported as an
/// error status.
pub fn validate(check: &dyn Check, site: &Site) -> CheckStatus {
    let title = check.title();
    match panic::catch_unwind(AssertUnwindSafe(|| check.run(site))) {
        Ok(Ok(())) => CheckStatus::pass(title),
        Ok(Err(CheckError::Failed(message))) => CheckStatus::fail(title, message),
        Ok(Err(e)) => {
            warn!(check = title, error = %e, "check could not complete");
            CheckStatus::error(title, e.to_string())
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "check panicked".to_string());
            warn!(check = title, %message, "check panicked");
            CheckStatus::error(title, format!("check panicked: {message}"))
        }
    }
}

/// Harness-side settings that checks need at construction time.
#[derive(Debug, Clone)]
pub struct CheckEnv {
    /// File the mail-capture sink writes the latest message to.
    pub mail_file: PathBuf,
    pub mail_wait: MailWait,
}

impl Default for CheckEnv {
    fn default() -> Self {
        Self {
            mail_file: PathBuf::from("rajdhani.mail"),
            mail_wait: MailWait::default(),
        }
    }
}

impl From<&Config> for CheckEnv {
    fn from(config: &Config) -> Self {
        Self {
            mail_file: config.mail_file.clone(),
            mail_wait: config.mail_wait(),
        }
    }
}
