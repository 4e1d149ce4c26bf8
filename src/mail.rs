//! Reader for the mail-capture file.
//!
//! The capture sink overwrites a single file with the most recently received
//! message, adding `X-MailFrom`/`X-RcptTo` envelope headers. Delivery happens
//! asynchronously after the triggering request returns, so callers snapshot
//! the file before acting and then poll for a change with a bounded timeout.

use mail_parser::MessageParser;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to read captured mail {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no captured mail found at {0}")]
    Missing(PathBuf),

    #[error("captured mail at {0} is not a valid message")]
    Unparseable(PathBuf),
}

/// Identity of the capture file contents at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailStamp {
    modified: SystemTime,
    len: u64,
}

/// Bounded poll settings for waiting on asynchronously captured mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailWait {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for MailWait {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            interval: Duration::from_millis(250),
        }
    }
}

/// The fields of a captured message the harness asserts on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedMail {
    pub sender: Option<String>,
    pub recipients: Vec<String>,
    pub subject: Option<String>,
    pub body: String,
}

impl CapturedMail {
    /// Parse a raw RFC 5322 message.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let message = MessageParser::default().parse(raw)?;

        let sender = message
            .header_raw("X-MailFrom")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .or_else(|| {
                message
                    .from()
                    .and_then(|from| from.first())
                    .and_then(|addr| addr.address())
                    .map(str::to_string)
            });

        let mut recipients: Vec<String> = message
            .header_raw("X-RcptTo")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|addr| !addr.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if let Some(to) = message.to() {
            for addr in to.iter().filter_map(|addr| addr.address()) {
                if !recipients.iter().any(|r| r.eq_ignore_ascii_case(addr)) {
                    recipients.push(addr.to_string());
                }
            }
        }

        Some(Self {
            sender,
            recipients,
            subject: message.subject().map(str::to_string),
            body: message
                .body_text(0)
                .map(|text| text.into_owned())
                .unwrap_or_default(),
        })
    }

    /// Whether `address` is among the recipients (case-insensitive).
    pub fn is_addressed_to(&self, address: &str) -> bool {
        self.recipients
            .iter()
            .any(|recipient| recipient.eq_ignore_ascii_case(address.trim()))
    }
}

/// Read-only handle on the capture file.
#[derive(Debug, Clone)]
pub struct MailCapture {
    path: PathBuf,
}

impl MailCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current stamp of the capture file, `None` if nothing was captured yet.
    pub fn stamp(&self) -> Result<Option<MailStamp>, MailError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(MailStamp {
                modified: meta.modified().map_err(|source| self.io_error(source))?,
                len: meta.len(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(self.io_error(source)),
        }
    }

    /// The most recently captured message.
    pub fn latest(&self) -> Result<CapturedMail, MailError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MailError::Missing(self.path.clone()))
            }
            Err(source) => return Err(self.io_error(source)),
        };
        CapturedMail::parse(&raw).ok_or_else(|| MailError::Unparseable(self.path.clone()))
    }

    /// Poll until the capture file differs from `since`, then return its message.
    ///
    /// Returns `Ok(None)` when nothing new arrived before `wait.timeout`.
    pub fn wait_for_new(
        &self,
        since: Option<MailStamp>,
        wait: MailWait,
    ) -> Result<Option<CapturedMail>, MailError> {
        let deadline = Instant::now() + wait.timeout;
        loop {
            let current = self.stamp()?;
            if current.is_some() && current != since {
                // The sink may still be writing; an unparseable file is retried.
                match self.latest() {
                    Ok(mail) => return Ok(Some(mail)),
                    Err(MailError::Unparseable(_)) if Instant::now() < deadline => {}
                    Err(e) => return Err(e),
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            debug!(path = %self.path.display(), "waiting for captured mail");
            thread::sleep(wait.interval);
        }
    }

    fn io_error(&self, source: io::Error) -> MailError {
        MailError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
