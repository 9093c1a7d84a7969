//! Test doubles and common utilities for contract tests
//!
//! The doubles record every call so tests can assert on exactly what the
//! engine asked of its collaborators.

#![allow(dead_code)]

use ddns_core::config::DdnsConfig;
use ddns_core::error::{Error, Result};
use ddns_core::traits::{DnsProvider, IpSource, RemoteRecord};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// An IP source returning a fixed (but swappable) address
pub struct StaticIpSource {
    /// Address to return; `None` simulates a host without usable interface
    current_ip: Arc<Mutex<Option<IpAddr>>>,
    /// Call counter for current()
    current_call_count: Arc<AtomicUsize>,
}

impl StaticIpSource {
    pub fn new(current_ip: IpAddr) -> Self {
        Self {
            current_ip: Arc::new(Mutex::new(Some(current_ip))),
            current_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source that never finds an address
    pub fn unavailable() -> Self {
        Self {
            current_ip: Arc::new(Mutex::new(None)),
            current_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times current() was called
    pub fn current_call_count(&self) -> usize {
        self.current_call_count.load(Ordering::SeqCst)
    }

    /// Change the address returned by subsequent calls
    pub fn set_ip(&self, ip: Option<IpAddr>) {
        *self.current_ip.lock().unwrap() = ip;
    }

    /// Create a new StaticIpSource that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            current_ip: Arc::clone(&other.current_ip),
            current_call_count: Arc::clone(&other.current_call_count),
        }
    }
}

#[async_trait::async_trait]
impl IpSource for StaticIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.current_call_count.fetch_add(1, Ordering::SeqCst);
        self.current_ip
            .lock()
            .unwrap()
            .ok_or_else(|| Error::no_address("no non-loopback interface"))
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// A mock DnsProvider backed by an in-memory record list
///
/// Successful updates are applied to the stored records, so a second pass
/// sees what the first one wrote.
pub struct MockDnsProvider {
    /// Records served by list_records()
    records: Arc<Mutex<Vec<RemoteRecord>>>,
    /// Call counter for list_records()
    list_call_count: Arc<AtomicUsize>,
    /// Every record handed to update_record(), in call order
    updates: Arc<Mutex<Vec<RemoteRecord>>>,
    /// Record names whose update fails
    failing_names: Arc<Mutex<HashSet<String>>>,
    /// Whether list_records() fails
    fail_listing: Arc<Mutex<bool>>,
}

impl MockDnsProvider {
    pub fn new(records: Vec<RemoteRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            updates: Arc::new(Mutex::new(Vec::new())),
            failing_names: Arc::new(Mutex::new(HashSet::new())),
            fail_listing: Arc::new(Mutex::new(false)),
        }
    }

    /// Create a new MockDnsProvider that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            list_call_count: Arc::clone(&other.list_call_count),
            updates: Arc::clone(&other.updates),
            failing_names: Arc::clone(&other.failing_names),
            fail_listing: Arc::clone(&other.fail_listing),
        }
    }

    /// Make updates of `name` fail
    pub fn fail_updates_of(&self, name: &str) {
        self.failing_names.lock().unwrap().insert(name.to_string());
    }

    /// Make list_records() fail
    pub fn fail_listing(&self) {
        *self.fail_listing.lock().unwrap() = true;
    }

    /// Get the number of times list_records() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times update_record() was called
    pub fn update_call_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    /// Get the records passed to update_record(), in call order
    pub fn updates(&self) -> Vec<RemoteRecord> {
        self.updates.lock().unwrap().clone()
    }

    /// Get the names passed to update_record(), in call order
    pub fn updated_names(&self) -> Vec<String> {
        self.updates().into_iter().map(|r| r.name).collect()
    }

    /// Current stored value of a record
    pub fn value_of(&self, name: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.value.clone())
    }

    /// Total provider calls (list + update)
    pub fn total_call_count(&self) -> usize {
        self.list_call_count() + self.update_call_count()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_records(&self, _domain: &str) -> Result<Vec<RemoteRecord>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        if *self.fail_listing.lock().unwrap() {
            return Err(Error::provider("mock", "listing failed"));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn update_record(&self, record: &RemoteRecord) -> Result<()> {
        self.updates.lock().unwrap().push(record.clone());

        if self.failing_names.lock().unwrap().contains(&record.name) {
            return Err(Error::provider("mock", format!("update of {} rejected", record.name)));
        }

        let mut records = self.records.lock().unwrap();
        if let Some(stored) = records.iter_mut().find(|r| r.record_id == record.record_id) {
            *stored = record.clone();
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Shorthand for an A record
pub fn a_record(id: &str, name: &str, value: &str, ttl: u32) -> RemoteRecord {
    RemoteRecord::new(id, name, "A", value, ttl)
}

/// Shorthand for an AAAA record
pub fn aaaa_record(id: &str, name: &str, value: &str, ttl: u32) -> RemoteRecord {
    RemoteRecord::new(id, name, "AAAA", value, ttl)
}

/// Helper to create a DdnsConfig for testing
pub fn config_with(sub_domains: &[(&str, u32)]) -> DdnsConfig {
    sub_domains
        .iter()
        .fold(DdnsConfig::new("test-id", "test-secret", "example.com"), |config, (name, ttl)| {
            config.with_sub_domain(*name, *ttl)
        })
}

/// The home/office/other fixture
pub fn home_office_records() -> Vec<RemoteRecord> {
    vec![
        a_record("1", "home", "1.2.3.4", 300),
        a_record("2", "office", "5.6.7.8", 300),
        a_record("3", "other", "9.9.9.9", 300),
    ]
}
