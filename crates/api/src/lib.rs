//! Upstream HTTP client utilities.
//!
//! This module provides a lightweight client for talking to one configured
//! target. It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults
//! - Validating target base addresses for safety
//! - Building requests with a consistent User-Agent and Accept headers
//!
//! The primary entry point is [`TargetClient`]. Create an instance via
//! [`TargetClient::new`], and then build requests with
//! [`TargetClient::request`].
//!
//! # Example
//!
//! ```ignore
//! use fanout_api::TargetClient;
//! use fanout_types::Target;
//!
//! let http = TargetClient::build_http(&Default::default())?;
//! let client = TargetClient::new(&Target::new("primary", "https://api.example.com"), http)?;
//! let res = client.request(reqwest::Method::GET, "/users").send().await?;
//! println!("status: {}", res.status());
//! ```

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use fanout_types::Target;
use indexmap::IndexMap;
use reqwest::{Client, RequestBuilder, Url, header};
use tracing::debug;

/// Connect timeout applied to every upstream connection. Request deadlines
/// are owned by the dispatcher, not by the client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
/// Thin wrapper around a shared `reqwest::Client` bound to one target.
///
/// The underlying client is cheap to clone and is shared between every
/// target of a field so connection pools are reused.
pub struct TargetClient {
    pub target_name: String,
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
}

impl TargetClient {
    /// Construct a [`TargetClient`] for `target` on top of a shared client.
    ///
    /// The target address must be an absolute `http` or `https` URL with a
    /// host. A trailing slash is stripped so path templates can start with `/`.
    pub fn new(target: &Target, http: Client) -> Result<Self> {
        validate_base_url(&target.address).with_context(|| format!("target '{}'", target.name))?;
        let base_url = target.address.trim_end_matches('/').to_string();
        Ok(Self {
            target_name: target.name.clone(),
            base_url,
            http,
            user_agent: format!("fanout/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    /// Build the shared HTTP client with JSON defaults plus static headers.
    pub fn build_http(static_headers: &IndexMap<String, String>) -> Result<Client> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        for (name, value) in static_headers {
            let header_name = header::HeaderName::from_bytes(name.as_bytes()).with_context(|| format!("invalid header name '{name}'"))?;
            let header_value = header::HeaderValue::from_str(value).with_context(|| format!("invalid value for header '{name}'"))?;
            default_headers.insert(header_name, header_value);
        }

        Client::builder()
            .default_headers(default_headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("build http client")
    }

    /// Build a `reqwest::RequestBuilder` for a method and target-relative path.
    pub fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(target_name = %self.target_name, %url, "building request");

        self.http.request(method, url).header(header::USER_AGENT, &self.user_agent)
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - scheme must be `http` or `https`
/// - a host is required
pub fn validate_base_url(base: &str) -> Result<()> {
    let parsed_base_url = Url::parse(base).map_err(|e| anyhow!("invalid target address '{}': {}", base, e))?;

    let scheme = parsed_base_url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(anyhow!(
            "target address must use http or https; got '{}://'",
            scheme
        ));
    }

    if parsed_base_url.host_str().is_none() {
        return Err(anyhow!("target address '{}' must include a host", base));
    }

    Ok(())
}
