// # Alibaba Cloud DNS Provider
//
// This crate provides the alidns implementation of `DnsProvider`.
//
// ## Architectural Constraints
//
// ### Trust Level: Untrusted (DNS Provider)
//
// **Allowed Capabilities**:
// - ✅ HTTPS calls to the alidns RPC endpoint only
// - ✅ Parse alidns responses
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Implement retry logic (the next pass is the retry)
// - ❌ Decide which records need an update (owned by DdnsEngine)
// - ❌ Cache records beyond a single call
//
// ## Security Requirements
//
// - The access key secret NEVER appears in logs or `Debug` output
// - Empty credentials are rejected at construction
//
// ## API Reference
//
// - RPC style, signature version 1.0 (see [`signature`])
// - `DescribeDomainRecords`: paginated listing of a domain's records
// - `UpdateDomainRecord`: set RR, Type, Value and TTL of a record by id

pub mod signature;

use async_trait::async_trait;
use ddns_core::config::DdnsConfig;
use ddns_core::traits::{DnsProvider, RemoteRecord};
use ddns_core::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

/// Public alidns endpoint
pub const ALIDNS_ENDPOINT: &str = "https://alidns.aliyuncs.com";

/// Region the client signs for
const REGION_ID: &str = "cn-hangzhou";

/// alidns API version
const API_VERSION: &str = "2015-01-09";

/// Largest page `DescribeDomainRecords` accepts
const PAGE_SIZE: u32 = 500;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider name used in errors and logs
const PROVIDER: &str = "alidns";

/// Alibaba Cloud DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, listing is performed as usual but updates are
/// only logged. The engine sees them as successful.
pub struct AlidnsProvider {
    /// AccessKey ID
    access_key_id: String,

    /// AccessKey secret
    /// ⚠️ NEVER log this value
    access_key_secret: String,

    /// API endpoint without trailing slash
    endpoint: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: list for real, log updates instead of sending them
    dry_run: bool,
}

// Custom Debug implementation that hides the secret
impl std::fmt::Debug for AlidnsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlidnsProvider")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl AlidnsProvider {
    /// Create a new alidns provider against the public endpoint
    ///
    /// # Errors
    ///
    /// `Error::Config` if either credential is empty.
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Result<Self> {
        let access_key_id = access_key_id.into();
        let access_key_secret = access_key_secret.into();

        if access_key_id.trim().is_empty() {
            return Err(Error::config("alidns AccessKey ID cannot be empty"));
        }
        if access_key_secret.trim().is_empty() {
            return Err(Error::config("alidns AccessKey secret cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Ok(Self {
            access_key_id,
            access_key_secret,
            endpoint: ALIDNS_ENDPOINT.to_string(),
            client,
            dry_run: false,
        })
    }

    /// Create a provider from the credentials in a validated configuration
    pub fn from_config(config: &DdnsConfig) -> Result<Self> {
        Self::new(
            config.access_key_id.clone(),
            config.access_key_secret.clone(),
        )
    }

    /// Send requests to another endpoint (e.g. a regional one or a mock server)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether updates are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Parameters shared by every request
    fn common_params(&self, action: &str) -> BTreeMap<String, String> {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = uuid::Uuid::new_v4().to_string();

        [
            ("Action", action),
            ("Format", "JSON"),
            ("Version", API_VERSION),
            ("AccessKeyId", self.access_key_id.as_str()),
            ("SignatureMethod", "HMAC-SHA1"),
            ("SignatureVersion", "1.0"),
            ("SignatureNonce", nonce.as_str()),
            ("Timestamp", timestamp.as_str()),
            ("RegionId", REGION_ID),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// Build the signed request URL
    fn signed_url(&self, params: &BTreeMap<String, String>) -> String {
        let query = signature::canonical_query(params);
        let signature = signature::sign(
            &self.access_key_secret,
            &signature::string_to_sign(&query),
        );
        format!(
            "{}/?{}&Signature={}",
            self.endpoint,
            query,
            signature::percent_encode(&signature)
        )
    }

    /// Perform one signed API call and decode its JSON response
    async fn call<T: DeserializeOwned>(&self, action: &str, extra: &[(&str, String)]) -> Result<T> {
        let mut params = self.common_params(action);
        for (key, value) in extra {
            params.insert(key.to_string(), value.clone());
        }

        let response = self
            .client
            .get(self.signed_url(&params))
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read {} response: {}", action, e)))?;

        if !status.is_success() {
            return Err(map_api_error(action, status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("Failed to parse {} response: {}", action, e);
            Error::from(e)
        })
    }

    /// Fetch one page of a domain's records
    async fn describe_page(&self, domain: &str, page: u32) -> Result<DescribeDomainRecordsResponse> {
        self.call(
            "DescribeDomainRecords",
            &[
                ("DomainName", domain.to_string()),
                ("PageNumber", page.to_string()),
                ("PageSize", PAGE_SIZE.to_string()),
            ],
        )
        .await
    }
}

#[async_trait]
impl DnsProvider for AlidnsProvider {
    /// List the domain's address records
    ///
    /// Every page of `DescribeDomainRecords` is read. Records that are not
    /// `A` or `AAAA` are dropped.
    async fn list_records(&self, domain: &str) -> Result<Vec<RemoteRecord>> {
        let mut records = Vec::new();
        let mut seen = 0u64;
        let mut page = 1u32;

        loop {
            let response = self.describe_page(domain, page).await?;
            let batch = response.domain_records.record;
            let batch_len = batch.len() as u64;
            seen += batch_len;

            records.extend(
                batch
                    .into_iter()
                    .filter(|r| r.record_type == "A" || r.record_type == "AAAA")
                    .map(RemoteRecord::from),
            );

            if batch_len == 0 || seen >= response.total_count {
                break;
            }
            page += 1;
        }

        tracing::debug!(
            "Listed {} address record(s) of {} across {} page(s)",
            records.len(),
            domain,
            page
        );
        Ok(records)
    }

    /// Write value and TTL of a record
    ///
    /// One `UpdateDomainRecord` call, or none in dry-run mode.
    async fn update_record(&self, record: &RemoteRecord) -> Result<()> {
        if record.record_id.is_empty() {
            return Err(Error::invalid_input(format!(
                "Record {} has no RecordId",
                record.name
            )));
        }

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would update record {} ({} {}) -> {} ttl {}",
                record.record_id,
                record.record_type,
                record.name,
                record.value,
                record.ttl
            );
            return Ok(());
        }

        let response: UpdateDomainRecordResponse = self
            .call(
                "UpdateDomainRecord",
                &[
                    ("RecordId", record.record_id.clone()),
                    ("RR", record.name.clone()),
                    ("Type", record.record_type.clone()),
                    ("Value", record.value.clone()),
                    ("TTL", record.ttl.to_string()),
                ],
            )
            .await?;

        tracing::debug!(
            "UpdateDomainRecord {} accepted (request {})",
            record.record_id,
            response.request_id
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Map an unsuccessful response to an error
///
/// The body normally carries `Code` and `Message`; both are kept in the error.
fn map_api_error(action: &str, status: u16, body: &str) -> Error {
    let parsed: ErrorResponse = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.code.unwrap_or_default();
    let detail = match parsed.message {
        Some(message) => format!("{} failed: {} ({}), HTTP {}", action, code, message, status),
        None => format!("{} failed: HTTP {}: {}", action, status, body.trim()),
    };

    if status == 401
        || status == 403
        || code.starts_with("InvalidAccessKeyId")
        || code == "SignatureDoesNotMatch"
    {
        return Error::auth(detail);
    }
    if status == 429 || code.contains("Throttling") {
        return Error::rate_limited(detail);
    }
    if status == 404 || code == "InvalidDomainName.NoExist" || code == "DomainRecordNotBelongToUser" {
        return Error::not_found(detail);
    }
    if (500..=599).contains(&status) {
        return Error::dns_provider(format!("{} server error (transient): {}", PROVIDER, detail));
    }
    Error::provider(PROVIDER, detail)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeDomainRecordsResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    domain_records: DomainRecords,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DomainRecords {
    #[serde(default)]
    record: Vec<AlidnsRecord>,
}

/// A record as alidns returns it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AlidnsRecord {
    record_id: String,
    #[serde(rename = "RR")]
    rr: String,
    #[serde(rename = "Type")]
    record_type: String,
    value: String,
    #[serde(rename = "TTL")]
    ttl: u32,
}

impl From<AlidnsRecord> for RemoteRecord {
    fn from(record: AlidnsRecord) -> Self {
        RemoteRecord::new(
            record.record_id,
            record.rr,
            record.record_type,
            record.value,
            record.ttl,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateDomainRecordResponse {
    #[serde(default)]
    request_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    code: Option<String>,
    message: Option<String>,
}
