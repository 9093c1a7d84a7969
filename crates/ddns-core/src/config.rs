//! Configuration types for the DDNS system
//!
//! The configuration is a JSON document loaded once at startup and never
//! mutated afterwards:
//!
//! ```json
//! {
//!   "AccessKeyId": "LTAI...",
//!   "AccessKeySecret": "...",
//!   "Domain": "example.com",
//!   "SubDomains": [
//!     { "Name": "home", "Interval": 600 },
//!     { "Name": "office", "Interval": 600 }
//!   ],
//!   "IpSource": { "Type": "local", "Version": "v4" }
//! }
//! ```
//!
//! `AccessId`, `AccessKey` and `MainDomain` are accepted as aliases for the
//! first three keys.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "settings.json";

/// Main DDNS configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DdnsConfig {
    /// Provider access key id
    #[serde(alias = "AccessId")]
    pub access_key_id: String,

    /// Provider access key secret
    #[serde(alias = "AccessKey")]
    pub access_key_secret: String,

    /// Managed domain (e.g. "example.com")
    #[serde(alias = "MainDomain")]
    pub domain: String,

    /// Subdomains kept in sync with the resolved address
    pub sub_domains: Vec<SubDomainConfig>,

    /// Where the address to publish comes from
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

// The access key secret must never reach the logs.
impl std::fmt::Debug for DdnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DdnsConfig")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("sub_domains", &self.sub_domains)
            .field("ip_source", &self.ip_source)
            .field("engine", &self.engine)
            .finish()
    }
}

impl DdnsConfig {
    /// Create a configuration with the given credentials and domain and no subdomains
    pub fn new(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            domain: domain.into(),
            sub_domains: Vec::new(),
            ip_source: IpSourceConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Add a managed subdomain
    pub fn with_sub_domain(mut self, name: impl Into<String>, interval: u32) -> Self {
        self.sub_domains.push(SubDomainConfig::new(name, interval));
        self
    }

    /// Set the IP source
    pub fn with_ip_source(mut self, ip_source: IpSourceConfig) -> Self {
        self.ip_source = ip_source;
        self
    }

    /// Default configuration path: `settings.json` in the working directory
    pub fn default_path() -> crate::Result<PathBuf> {
        Ok(std::env::current_dir()?.join(DEFAULT_CONFIG_FILE))
    }

    /// Load and validate a configuration file
    ///
    /// Both an unreadable file and an unparsable document are reported as
    /// [`crate::Error::Config`], which callers treat as fatal.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config(format!("cannot read {}: {}", path.display(), e))
        })?;

        Self::from_json_str(&raw).map_err(|e| match e {
            crate::Error::Config(msg) => {
                crate::Error::config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse and validate a configuration document
    pub fn from_json_str(raw: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| crate::Error::config(format!("invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.access_key_id.trim().is_empty() {
            return Err(crate::Error::config("AccessKeyId cannot be empty"));
        }
        if self.access_key_secret.trim().is_empty() {
            return Err(crate::Error::config("AccessKeySecret cannot be empty"));
        }
        if self.domain.trim().is_empty() {
            return Err(crate::Error::config("Domain cannot be empty"));
        }
        if self.sub_domains.is_empty() {
            return Err(crate::Error::config("No subdomains configured"));
        }

        let mut seen = HashSet::new();
        for sub in &self.sub_domains {
            sub.validate()?;
            if !seen.insert(sub.name.as_str()) {
                return Err(crate::Error::config(format!(
                    "Duplicate subdomain name: {}",
                    sub.name
                )));
            }
        }

        self.ip_source.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// A subdomain managed by the reconciler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubDomainConfig {
    /// Record name relative to the domain (e.g. "home", "@", "*.lab")
    pub name: String,

    /// Refresh interval in seconds, applied as the record TTL on update
    pub interval: u32,
}

impl SubDomainConfig {
    /// Create a new subdomain entry
    pub fn new(name: impl Into<String>, interval: u32) -> Self {
        Self {
            name: name.into(),
            interval,
        }
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::config("Subdomain name cannot be empty"));
        }
        if self.name != self.name.trim() {
            return Err(crate::Error::config(format!(
                "Subdomain name has surrounding whitespace: '{}'",
                self.name
            )));
        }
        if self.interval == 0 {
            return Err(crate::Error::config(format!(
                "Interval for subdomain {} must be > 0",
                self.name
            )));
        }
        Ok(())
    }
}

/// IP source configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all = "snake_case", rename_all_fields = "PascalCase")]
pub enum IpSourceConfig {
    /// First non-loopback address of a local network interface
    Local {
        /// Address family to publish
        #[serde(default)]
        version: IpVersion,
    },

    /// Public address reported by an address-echo service
    Http {
        /// URL returning the caller's address as plain text
        url: String,
        /// Address family to publish
        #[serde(default)]
        version: IpVersion,
    },
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            IpSourceConfig::Http { url, .. } => {
                if url.is_empty() {
                    return Err(crate::Error::config("HTTP IP source URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "HTTP IP source URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                Ok(())
            }
            IpSourceConfig::Local { .. } => Ok(()),
        }
    }

    /// Source type name (for logging)
    pub fn type_name(&self) -> &'static str {
        match self {
            IpSourceConfig::Local { .. } => "local",
            IpSourceConfig::Http { .. } => "http",
        }
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        IpSourceConfig::Local {
            version: IpVersion::default(),
        }
    }
}

/// Address family to publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// IPv4 (A records)
    #[default]
    V4,
    /// IPv6 (AAAA records)
    V6,
}

impl From<std::net::IpAddr> for IpVersion {
    fn from(ip: std::net::IpAddr) -> Self {
        match ip {
            std::net::IpAddr::V4(_) => IpVersion::V4,
            std::net::IpAddr::V6(_) => IpVersion::V6,
        }
    }
}

impl IpVersion {
    /// Whether `ip` belongs to this family
    pub fn matches(&self, ip: &std::net::IpAddr) -> bool {
        match self {
            IpVersion::V4 => ip.is_ipv4(),
            IpVersion::V6 => ip.is_ipv6(),
        }
    }

    /// DNS record type carrying addresses of this family
    pub fn record_type(&self) -> &'static str {
        match self {
            IpVersion::V4 => "A",
            IpVersion::V6 => "AAAA",
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EngineConfig {
    /// Capacity of the internal event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("EventChannelCapacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    1000
}
