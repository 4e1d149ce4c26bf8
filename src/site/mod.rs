//! HTTP access to one deployed app.
//!
//! A [`Site`] is built fresh for every verification run and dropped afterwards.
//! Requests go through a stateless client by default; [`Site::with_session`]
//! swaps in a cookie-bearing client for login-scoped checks.

mod client;
mod extract;
mod session;

pub(crate) use client::USER_AGENT;
pub use extract::{extract_booking_cards, extract_table, BookingCard, Table};

use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use session::SessionGuard;

/// A row returned by the data explorer, keyed by column name.
pub type Row = BTreeMap<String, String>;

/// Errors raised while talking to a deployment.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("{0}")]
    Parse(String),

    #[error("unexpected response from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{0}'")]
    InvalidUrl(String),

    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Connection settings for a [`Site`].
#[derive(Debug, Clone)]
pub struct SiteOptions {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub login_path: String,
    pub explorer_path: String,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            login_path: "/login".to_string(),
            explorer_path: "/data-explorer".to_string(),
        }
    }
}

impl From<&Config> for SiteOptions {
    fn from(config: &Config) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            login_path: config.login_path.clone(),
            explorer_path: config.explorer_path.clone(),
        }
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub status: StatusCode,
    pub body: String,
}

impl Page {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Turn a non-2xx response into [`SiteError::HttpStatus`].
    pub fn error_for_status(self) -> Result<Self, SiteError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SiteError::HttpStatus {
                url: self.url,
                status: self.status,
            })
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SiteError> {
        serde_json::from_str(&self.body).map_err(|source| SiteError::Json {
            url: self.url.clone(),
            source,
        })
    }
}

/// Optional filters for the train search API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub from_station_code: String,
    pub to_station_code: String,
    pub ticket_class: Option<String>,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
}

impl SearchQuery {
    fn params(&self) -> Vec<(&str, &str)> {
        let mut params = vec![
            ("from", self.from_station_code.as_str()),
            ("to", self.to_station_code.as_str()),
        ];
        let optional = [
            ("class", &self.ticket_class),
            ("dt", &self.departure_time),
            ("at", &self.arrival_time),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                params.push((key, value.as_str()));
            }
        }
        params
    }
}

/// An HTTP client bound to one deployment.
pub struct Site {
    name: String,
    base_url: String,
    options: SiteOptions,
    client: Client,
    session: RefCell<Option<Client>>,
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("in_session", &self.in_session())
            .finish()
    }
}

impl Site {
    /// Bind a site to an explicit base URL.
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        options: SiteOptions,
    ) -> Result<Self, SiteError> {
        let parsed =
            Url::parse(base_url).map_err(|_| SiteError::InvalidUrl(base_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SiteError::InvalidUrl(base_url.to_string()));
        }

        let client = client::create_http_client(&options, false)?;
        Ok(Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            options,
            client,
            session: RefCell::new(None),
        })
    }

    /// Bind a site to `scheme://<app>.<domain>` as configured.
    pub fn for_app(name: &str, config: &Config) -> Result<Self, SiteError> {
        let base_url = format!("{}://{}.{}", config.scheme, name, config.domain);
        Self::new(name, &base_url, SiteOptions::from(config))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests currently go through a scoped cookie session.
    pub fn in_session(&self) -> bool {
        self.session.borrow().is_some()
    }

    /// Resolve a path against the base URL.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Page, SiteError> {
        self.send(Method::GET, path, query, None, None)
    }

    pub fn get_with_headers(
        &self,
        path: &str,
        query: &[(&str, &str)],
        headers: &HeaderMap,
    ) -> Result<Page, SiteError> {
        self.send(Method::GET, path, query, None, Some(headers))
    }

    pub fn post(&self, path: &str, form: &[(&str, &str)]) -> Result<Page, SiteError> {
        self.send(Method::POST, path, &[], Some(form), None)
    }

    pub fn post_with_headers(
        &self,
        path: &str,
        form: &[(&str, &str)],
        headers: &HeaderMap,
    ) -> Result<Page, SiteError> {
        self.send(Method::POST, path, &[], Some(form), Some(headers))
    }

    /// Run `body` with a cookie-persisting session active.
    ///
    /// All requests issued through the site inside `body` share one cookie jar.
    /// The previous transport is restored when `body` returns, whether it
    /// succeeded, returned an error, or panicked.
    pub fn with_session<T>(&self, body: impl FnOnce(&Site) -> T) -> Result<T, SiteError> {
        let session = client::create_http_client(&self.options, true)?;
        let _guard = SessionGuard::enter(&self.session, session);
        debug!(site = %self.name, "entered scoped session");
        Ok(body(self))
    }

    /// Log in with `email` on the current transport.
    pub fn login(&self, email: &str) -> Result<Page, SiteError> {
        let path = self.options.login_path.clone();
        self.post(&path, &[("email", email)])?.error_for_status()
    }

    /// Codes of all stations suggested for `prefix`.
    pub fn station_autocomplete(&self, prefix: &str) -> Result<BTreeSet<String>, SiteError> {
        let page = self.get("/api/stations", &[("q", prefix)])?;
        let results: Vec<Value> = page.json()?;
        results
            .iter()
            .map(|station| {
                station
                    .get("code")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        SiteError::Parse(format!(
                            "station suggestion without a string `code` field: {station}"
                        ))
                    })
            })
            .collect()
    }

    /// Feature flags advertised by the deployment.
    pub fn feature_flags(&self) -> Result<Map<String, Value>, SiteError> {
        self.get("/api/flags", &[])?.json()
    }

    /// Raw train objects returned by the search API.
    pub fn search_trains(&self, query: &SearchQuery) -> Result<Vec<Map<String, Value>>, SiteError> {
        self.get("/api/search", &query.params())?.json()
    }

    /// Run `sql` through the diagnostic data explorer.
    ///
    /// The leading serial-number column is dropped and each data row is zipped
    /// with the remaining header cells.
    pub fn query(&self, sql: &str) -> Result<Vec<Row>, SiteError> {
        let path = self.options.explorer_path.clone();
        let page = self.get(&path, &[("q", sql)])?.error_for_status()?;
        let table = extract_table(&page.body)?;

        let mut rows = table.into_iter();
        let header: Vec<String> = match rows.next() {
            Some(header) => header.into_iter().skip(1).collect(),
            None => return Ok(Vec::new()),
        };

        Ok(rows
            .map(|row| {
                header
                    .iter()
                    .cloned()
                    .zip(row.into_iter().skip(1))
                    .collect::<Row>()
            })
            .collect())
    }

    fn transport(&self) -> Client {
        self.session
            .borrow()
            .clone()
            .unwrap_or_else(|| self.client.clone())
    }

    fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        form: Option<&[(&str, &str)]>,
        headers: Option<&HeaderMap>,
    ) -> Result<Page, SiteError> {
        let url = self.url(path);
        debug!(site = %self.name, %method, %url, session = self.in_session(), "request");

        let mut request = self.transport().request(method, &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(form) = form {
            request = request.form(form);
        }
        if let Some(headers) = headers {
            request = request.headers(headers.clone());
        }

        let response = request.send().map_err(|source| SiteError::Network {
            url: url.clone(),
            source,
        })?;
        let status = response.status();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .map_err(|source| SiteError::Network { url, source })?;

        Ok(Page {
            url: final_url,
            status,
            body,
        })
    }
}
