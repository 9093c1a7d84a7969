// # Local Interface IP Source
//
// This crate provides an IP source that reads the host's own network
// interfaces.
//
// ## Selection Rule
//
// The first interface address (in enumeration order) that:
// - belongs to the configured family (IPv4 by default)
// - is not a loopback address
// - is not the unspecified address
// - for IPv6, is not link-local (fe80::/10)
//
// No match means the host has no publishable address right now. That is
// reported as `Error::NoAddressAvailable`, which aborts the current pass only.
//
// ## Platform Support
//
// Interface enumeration uses the `local-ip-address` crate, which covers
// Linux, macOS, Windows and the BSDs.

use async_trait::async_trait;
use ddns_core::config::{IpSourceConfig, IpVersion};
use ddns_core::traits::IpSource;
use ddns_core::{Error, Result};
use std::net::IpAddr;

/// IP source backed by the host's interface list
#[derive(Debug, Clone)]
pub struct LocalIpSource {
    /// Address family to publish
    version: IpVersion,
}

impl LocalIpSource {
    /// Create a local IP source for the given family
    pub fn new(version: IpVersion) -> Self {
        Self { version }
    }

    /// Create from configuration
    ///
    /// Fails if `config` is not a local source.
    pub fn from_config(config: &IpSourceConfig) -> Result<Self> {
        match config {
            IpSourceConfig::Local { version } => Ok(Self::new(*version)),
            other => Err(Error::config(format!(
                "Invalid config for local IP source: {}",
                other.type_name()
            ))),
        }
    }
}

#[async_trait]
impl IpSource for LocalIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let interfaces = local_ip_address::list_afinet_netifas()
            .map_err(|e| Error::ip_source(format!("Failed to list network interfaces: {}", e)))?;

        tracing::debug!("Detected {} interface address(es)", interfaces.len());

        match select_address(&interfaces, self.version) {
            Some((name, ip)) => {
                tracing::debug!("Selected {} from interface {}", ip, name);
                Ok(ip)
            }
            None => Err(Error::no_address(format!(
                "no non-loopback {} interface address",
                family_name(self.version)
            ))),
        }
    }

    fn version(&self) -> IpVersion {
        self.version
    }

    fn source_name(&self) -> &'static str {
        "local"
    }
}

/// Pick the publishable address from an interface list
///
/// Returns the interface name together with the address.
pub fn select_address(interfaces: &[(String, IpAddr)], version: IpVersion) -> Option<(&str, IpAddr)> {
    interfaces
        .iter()
        .find(|(_, ip)| version.matches(ip) && is_publishable(ip))
        .map(|(name, ip)| (name.as_str(), *ip))
}

fn is_publishable(ip: &IpAddr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return false;
    }
    match ip {
        IpAddr::V4(_) => true,
        IpAddr::V6(v6) => !v6.is_unicast_link_local(),
    }
}

fn family_name(version: IpVersion) -> &'static str {
    match version {
        IpVersion::V4 => "IPv4",
        IpVersion::V6 => "IPv6",
    }
}
