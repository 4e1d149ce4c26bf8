//! HTTP client construction for talking to a deployed app.
//!
//! Every client carries connect/request timeouts so a hung deployment turns into
//! a per-check error instead of blocking the whole run.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::{SiteError, SiteOptions};

/// User agent sent with every request issued by the harness.
pub(crate) const USER_AGENT: &str = concat!("rajdhani-checker/", env!("CARGO_PKG_VERSION"));

/// Header that lets a deployment recognise (and log) harness traffic.
pub(crate) const HARNESS_HEADER: &str = "x-rajdhani-checker";

/// Create an HTTP client with the configured timeouts.
///
/// `cookies` enables a per-client cookie jar; only scoped sessions ask for one.
pub(crate) fn create_http_client(options: &SiteOptions, cookies: bool) -> Result<Client, SiteError> {
    Client::builder()
        .connect_timeout(options.connect_timeout)
        .timeout(options.request_timeout)
        .user_agent(USER_AGENT)
        .default_headers(default_headers())
        .cookie_store(cookies)
        .build()
        .map_err(SiteError::Client)
}

/// Headers applied to every request unless the caller overrides them.
pub(crate) fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(HARNESS_HEADER),
        HeaderValue::from_static("1"),
    );
    headers
}
