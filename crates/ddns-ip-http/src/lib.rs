// # HTTP IP Source
//
// This crate provides an IP source that asks an address-echo service
// (e.g. api.ipify.org, ifconfig.me/ip, icanhazip.com) which address the
// host is reachable from.
//
// ## When To Use
//
// The local interface source publishes what the host itself sees. Behind
// NAT that is a private address; this source reports the public one.
//
// ## Behaviour
//
// Every `current()` call issues exactly one GET request:
// - non-2xx status, transport error or unparsable body ⇒ `Error::IpSource`
// - address of the wrong family ⇒ `Error::NoAddressAvailable`
//
// No caching and no polling: the scheduler decides when to ask again.

use async_trait::async_trait;
use ddns_core::config::{IpSourceConfig, IpVersion};
use ddns_core::traits::IpSource;
use ddns_core::{Error, Result};
use std::net::IpAddr;
use std::time::Duration;

/// Default HTTP timeout for address lookups
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// IP source backed by an address-echo HTTP endpoint
pub struct HttpIpSource {
    /// URL returning the caller's address as plain text
    url: String,

    /// Address family to accept
    version: IpVersion,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch the address from (e.g., "https://api.ipify.org")
    /// - `version`: Address family the response must belong to
    pub fn new(url: impl Into<String>, version: IpVersion) -> Self {
        Self {
            url: url.into(),
            version,
            client: reqwest::Client::builder()
                .timeout(DEFAULT_HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create from configuration
    ///
    /// Fails if `config` is not an HTTP source.
    pub fn from_config(config: &IpSourceConfig) -> Result<Self> {
        match config {
            IpSourceConfig::Http { url, version } => Ok(Self::new(url.clone(), *version)),
            other => Err(Error::config(format!(
                "Invalid config for HTTP IP source: {}",
                other.type_name()
            ))),
        }
    }

    /// Endpoint queried by this source
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_source(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ip_source(format!(
                "{} answered with HTTP {}",
                self.url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_source(format!("Failed to read response: {}", e)))?;

        let ip = parse_address(&body)?;
        if !self.version.matches(&ip) {
            return Err(Error::no_address(format!(
                "{} returned {} but a {} address is required",
                self.url,
                ip,
                self.version.record_type()
            )));
        }

        tracing::debug!("{} reports address {}", self.url, ip);
        Ok(ip)
    }

    fn version(&self) -> IpVersion {
        self.version
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Parse an address-echo response body
fn parse_address(body: &str) -> Result<IpAddr> {
    let text = body.trim();
    text.parse()
        .map_err(|_| Error::ip_source(format!("Invalid IP address in response: {:?}", text)))
}
