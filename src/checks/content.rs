//! Placeholder, feature-flag and page-content checks.

use serde::Deserialize;
use serde_json::Value;
use serde_yaml::Mapping;

use super::args::{self, scalar};
use super::{Check, CheckEnv, CheckError};
use crate::site::Site;
use crate::tasks::CatalogError;

/// Stands in for tasks whose checks are not written yet. Never passes.
#[derive(Debug)]
pub struct NotImplemented {
    title: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

impl NotImplemented {
    pub const KIND: &'static str = "check_not_implemented";
    pub const MESSAGE: &'static str = "This task does not have automated checks yet.";

    pub fn new() -> Self {
        Self {
            title: "Checks are not yet implemented for this task".to_string(),
        }
    }

    pub(crate) fn from_args(args: Mapping, _env: &CheckEnv) -> Result<Box<dyn Check>, CatalogError> {
        let NoArgs {} = args::parse(Self::KIND, args)?;
        Ok(Box::new(Self::new()))
    }
}

impl Default for NotImplemented {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for NotImplemented {
    fn title(&self) -> &str {
        &self.title
    }

    fn run(&self, _site: &Site) -> Result<(), CheckError> {
        Err(CheckError::failed(Self::MESSAGE))
    }
}

/// Passes when `/api/flags` reports a truthy value for the flag.
#[derive(Debug)]
pub struct FeatureFlag {
    flag: String,
    title: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FeatureFlagArgs {
    #[serde(deserialize_with = "scalar")]
    flag: String,
}

impl FeatureFlag {
    pub const KIND: &'static str = "check_flag";

    pub fn new(flag: impl Into<String>) -> Self {
        let flag = flag.into();
        Self {
            title: format!("Checks flag: {flag}"),
            flag,
        }
    }

    pub(crate) fn from_args(args: Mapping, _env: &CheckEnv) -> Result<Box<dyn Check>, CatalogError> {
        let parsed: FeatureFlagArgs = args::parse(Self::KIND, args)?;
        Ok(Box::new(Self::new(parsed.flag)))
    }
}

impl Check for FeatureFlag {
    fn title(&self) -> &str {
        &self.title
    }

    fn run(&self, site: &Site) -> Result<(), CheckError> {
        let flags = site.feature_flags()?;
        match flags.get(&self.flag) {
            Some(value) if is_truthy(value) => Ok(()),
            Some(value) => Err(CheckError::failed(format!(
                "Flag `{}` is not enabled (value: {value}).",
                self.flag
            ))),
            None => Err(CheckError::failed(format!(
                "Flag `{}` is missing from /api/flags.",
                self.flag
            ))),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Passes when the page at `url` contains `expected_text` verbatim.
#[derive(Debug)]
pub struct WebpageContent {
    url: String,
    expected_text: String,
    title: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WebpageContentArgs {
    #[serde(deserialize_with = "scalar")]
    url: String,
    #[serde(deserialize_with = "scalar")]
    expected_text: String,
}

impl WebpageContent {
    pub const KIND: &'static str = "check_webpage_content";

    pub fn new(url: impl Into<String>, expected_text: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            title: format!("Check webpage content: {url}"),
            url,
            expected_text: expected_text.into(),
        }
    }

    pub(crate) fn from_args(args: Mapping, _env: &CheckEnv) -> Result<Box<dyn Check>, CatalogError> {
        let parsed: WebpageContentArgs = args::parse(Self::KIND, args)?;
        if parsed.expected_text.is_empty() {
            return Err(CatalogError::InvalidArgs {
                kind: Self::KIND.to_string(),
                reason: "expected_text cannot be empty".to_string(),
            });
        }
        Ok(Box::new(Self::new(parsed.url, parsed.expected_text)))
    }
}

impl Check for WebpageContent {
    fn title(&self) -> &str {
        &self.title
    }

    fn run(&self, site: &Site) -> Result<(), CheckError> {
        let page = site.get(&self.url, &[])?;
        if page.body.contains(&self.expected_text) {
            return Ok(());
        }

        let mut message = format!(
            "Text `{}` is expected in web page {}, but it is not found.",
            self.expected_text, self.url
        );
        if !page.is_success() {
            message.push_str(&format!(" (HTTP {})", page.status));
        }
        Err(CheckError::Failed(message))
    }
}
