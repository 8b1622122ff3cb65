//! Console address discovery
//!
//! The sandbox monitor knows where each sandbox's agent socket lives. A
//! single `GET <monitor>/agent-url?sandbox=<id>` returns it as a
//! newline-terminated URI which [`SandboxAddress::parse`] turns into a
//! dialable address.
//!
//! Nothing here retries: an address that could not be discovered is not
//! worth dialing, and a stale one is never tried twice.

use std::time::Duration;

use url::Url;

use crate::address::SandboxAddress;
use crate::config::ConsoleConfig;
use crate::error::ResolveError;

/// Path of the lookup route on the monitor
pub const AGENT_URL_PATH: &str = "agent-url";

/// Client for the monitor's agent URL lookup
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    endpoint: String,
    client: reqwest::Client,
}

impl DiscoveryClient {
    /// Create a client for the monitor at `endpoint` (e.g. `http://localhost:8090`)
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ResolveError> {
        let endpoint = endpoint.into();
        let client = build_http_client(&endpoint, None)?;
        Ok(Self { endpoint, client })
    }

    /// Create a client from configuration, honouring `discovery_timeout`
    pub fn from_config(config: &ConsoleConfig) -> Result<Self, ResolveError> {
        let client = build_http_client(&config.monitor_address, config.discovery_timeout)?;
        Ok(Self {
            endpoint: config.monitor_address.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The full lookup URL for `sandbox_id`
    pub fn agent_url(&self, sandbox_id: &str) -> Result<Url, ResolveError> {
        let base = format!("{}/{}", self.endpoint.trim_end_matches('/'), AGENT_URL_PATH);
        let mut url = Url::parse(&base).map_err(|source| ResolveError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            source,
        })?;
        url.query_pairs_mut().append_pair("sandbox", sandbox_id);
        Ok(url)
    }

    /// Fetch the raw address string for `sandbox_id`
    pub async fn lookup(&self, sandbox_id: &str) -> Result<String, ResolveError> {
        let url = self.agent_url(sandbox_id)?;
        tracing::debug!(url = %url, "Querying monitor for console address");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| ResolveError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| ResolveError::Body {
            url: url.to_string(),
            source,
        })
    }

    /// Resolve `sandbox_id` to an address for the console on `port`.
    ///
    /// The port reported by the monitor is discarded in favour of `port`.
    ///
    /// # Arguments
    /// * `sandbox_id` - Sandbox to look up, sent as the `sandbox` query value
    /// * `port` - Guest port of the debug console
    ///
    /// # Returns
    /// The dialable address, or a [`ResolveError`] if the monitor cannot be
    /// reached, answers with a non-success status, or reports an address in
    /// an unsupported or malformed form.
    pub async fn resolve(&self, sandbox_id: &str, port: u32) -> Result<SandboxAddress, ResolveError> {
        let body = self.lookup(sandbox_id).await?;
        let address = SandboxAddress::parse(&body, port)?;
        tracing::info!(sandbox = sandbox_id, address = %address, "Resolved console address");
        Ok(address)
    }
}

/// The monitor runs on the sandbox host, so proxy settings from the
/// environment are not applied.
fn build_http_client(endpoint: &str, timeout: Option<Duration>) -> Result<reqwest::Client, ResolveError> {
    let mut builder = reqwest::Client::builder().no_proxy();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(|source| ResolveError::Request {
        url: endpoint.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_url() {
        let client = DiscoveryClient::new("http://localhost:8090").unwrap();
        let url = client.agent_url("abc123").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8090/agent-url?sandbox=abc123");
    }

    #[test]
    fn test_agent_url_trailing_slash() {
        let client = DiscoveryClient::new("http://127.0.0.1:9000/").unwrap();
        let url = client.agent_url("x").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/agent-url?sandbox=x");
    }

    #[test]
    fn test_agent_url_escapes_sandbox_id() {
        let client = DiscoveryClient::new("http://localhost:8090").unwrap();
        let url = client.agent_url("a b&c").unwrap();
        assert_eq!(url.query(), Some("sandbox=a+b%26c"));
    }

    #[test]
    fn test_invalid_endpoint() {
        let client = DiscoveryClient::new("localhost without scheme").unwrap();
        let err = client.agent_url("abc").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_from_config_uses_monitor_address() {
        let config = ConsoleConfig {
            monitor_address: "http://10.1.1.1:8090".into(),
            discovery_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let client = DiscoveryClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint(), "http://10.1.1.1:8090");
    }
}
