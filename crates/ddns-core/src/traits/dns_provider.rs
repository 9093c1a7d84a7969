// # DNS Provider Trait
//
// Defines the interface the engine uses to read and write records at a
// DNS provider.
//
// ## Implementations
//
// - Alibaba Cloud DNS: `ddns-provider-alidns` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     for mut record in provider.list_records("example.com").await? {
//         record.value = "1.2.3.4".to_string();
//         provider.update_record(&record).await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// A record as currently stored by the provider
///
/// The engine holds a transient copy per pass and only mutates `value` and
/// `ttl` locally to stage an update. It is never kept across passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    /// The record ID (provider-specific, opaque)
    pub record_id: String,
    /// The record name relative to the domain (e.g. "home")
    pub name: String,
    /// The record type ("A" or "AAAA")
    pub record_type: String,
    /// The record value (the published address)
    pub value: String,
    /// Time-to-live in seconds
    pub ttl: u32,
}

impl RemoteRecord {
    /// Create a new remote record
    pub fn new(
        record_id: impl Into<String>,
        name: impl Into<String>,
        record_type: impl Into<String>,
        value: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            name: name.into(),
            record_type: record_type.into(),
            value: value.into(),
            ttl,
        }
    }
}

/// Trait for DNS provider implementations
///
/// This trait defines the interface for listing and updating DNS records.
/// Implementations must handle the specifics of each provider's API.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads
/// - ❌ Implement retry logic or backoff (the next pass is the retry)
/// - ❌ Decide whether an update is needed (owned by `DdnsEngine`)
/// - ❌ Touch records the engine did not hand over
/// - ❌ Cache state beyond a single call
///
/// ## Example
///
/// ✅ **CORRECT**: Single-shot update, error returned to the engine
/// ```rust,ignore
/// async fn update_record(&self, record: &RemoteRecord) -> Result<()> {
///     let response = self.call("UpdateDomainRecord", &record_params(record)).await?;
///     if response.status().is_success() {
///         Ok(())
///     } else {
///         Err(Error::provider("alidns", "update failed")) // logged, pass continues
///     }
/// }
/// ```
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List the address records of a domain
    ///
    /// # Parameters
    ///
    /// - `domain`: The managed domain (e.g., "example.com")
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<RemoteRecord>)`: All address records of the domain, in any order
    /// - `Err(Error)`: If the listing failed
    async fn list_records(&self, domain: &str) -> Result<Vec<RemoteRecord>, crate::Error>;

    /// Update a record
    ///
    /// Applies `name`, `record_type`, `value` and `ttl` from `record` to the
    /// provider record identified by `record.record_id`.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The provider accepted the update
    /// - `Err(Error)`: If the update failed
    async fn update_record(&self, record: &RemoteRecord) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
