// # ddns-core
//
// Core library for the DDNS record reconciler.
//
// ## Architecture Overview
//
// This library provides the core functionality for dynamic DNS updates:
// - **IpSource**: Trait for determining the address to publish
// - **DnsProvider**: Trait for listing and updating DNS records via provider APIs
// - **DdnsEngine**: Core engine running one reconciliation pass at a time
// - **Scheduler**: Runs the engine once or on a fixed interval
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Stateless Passes**: Every pass starts from the provider's live records
// 3. **Selective Writes**: Only records that drifted from the address are updated
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Failure Isolation**: One record's failure never blocks its siblings

pub mod traits;
pub mod engine;
pub mod scheduler;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{IpSource, DnsProvider, RemoteRecord};
pub use engine::{DdnsEngine, EngineEvent, PassReport};
pub use scheduler::{Schedule, Scheduler, RunSummary, Ticker, IntervalTicker, ChannelTicker};
pub use config::{DdnsConfig, IpSourceConfig, IpVersion, SubDomainConfig};
pub use error::{Error, Result};
