// # IP Source Trait
//
// Defines the interface for determining the address to publish.
//
// ## Implementations
//
// - Local interface scan: `ddns-ip-local` crate
// - Address-echo service: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     // Resolve the address for this pass
//     let current_ip = source.current().await?;
//     println!("Publishing {}", current_ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

use crate::config::IpVersion;

/// Trait for IP source implementations
///
/// An IP source answers one question per pass: which address should the
/// managed records point to right now. It is asked again on every pass and
/// must not assume its previous answer is still valid.
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Read-only platform inspection (interface list, routing tables)
/// - ✅ One outbound request to an address-echo endpoint per call
///
/// ## Forbidden Capabilities
/// - ❌ Perform DNS updates (use `DnsProvider`)
/// - ❌ Implement retry logic (the next scheduled pass is the retry)
/// - ❌ Spawn background tasks or polling loops (scheduling is owned by `Scheduler`)
/// - ❌ Cache an address across calls
///
/// ## Failure Semantics
///
/// When no usable address exists, return [`crate::Error::NoAddressAvailable`].
/// The engine aborts the current pass without contacting the provider; the
/// condition is never fatal to the process.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The address to publish
    /// - `Err(Error::NoAddressAvailable)`: No usable address on this host
    /// - `Err(Error)`: Any other failure (network, parse)
    async fn current(&self) -> Result<IpAddr, crate::Error>;

    /// Get the address family this source returns
    fn version(&self) -> IpVersion {
        IpVersion::V4
    }

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
