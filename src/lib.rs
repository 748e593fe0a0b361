//! streamdns - An authoritative DNS server driven by a change-event feed.
//!
//! This crate serves A records for a fixed set of zones whose contents are
//! not static: an ordered stream of change events, delivered over NATS,
//! continuously mutates the record set while queries are being answered.
//!
//! ## Features
//!
//! - Real-time record updates via a versioned change-event feed
//! - Seed records served from startup, before the feed is connected
//! - Readiness-aware negative answers (SERVFAIL while syncing, NXDOMAIN once
//!   synced) so resolvers never cache a negative result prematurely
//! - Automatic feed resubscription with backoff and graceful shutdown
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          streamdns                             │
//! │                                                                │
//! │  ┌──────────────────┐    ┌──────────────────┐                 │
//! │  │ Feed Subscriber  │───▶│   Zone Store     │                 │
//! │  │ (NATS subject)   │    │   (in-memory)    │                 │
//! │  └──────────────────┘    └────────┬─────────┘                 │
//! │         │                         │                            │
//! │         │ UpsertRecord            ▼                            │
//! │         │ DeleteRecord       ┌──────────────────┐             │
//! │         │ SnapshotAvailable  │  Query Resolver  │◀── UDP/TCP  │
//! │         │                    │  (Hickory DNS)   │    :53      │
//! │         └───────────────────▶└──────────────────┘             │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Name Resolution
//!
//! Lookups are single-level: the query name is split at the first label
//! boundary, the leftmost label is the host and the remainder is the zone
//! key, matched verbatim against the seeded zone set.
//!
//! ```text
//! one.example.com.
//!   → host "one", zone "example.com."
//!   → zone must exist in the seed table
//!   → return the A record for "one", TTL from config
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use streamdns::{DnsConfig, DnsServer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config: DnsConfig = load_config();
//!
//!     let shutdown = CancellationToken::new();
//!     let server = DnsServer::new(config).expect("invalid seed records");
//!     server.run(shutdown).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod resolver;
pub mod server;
pub mod state;
pub mod subscription;
pub mod telemetry;

// Re-export main types
pub use config::{Config, DnsConfig, SoaConfig, TelemetryConfig};
pub use error::DnsError;
pub use event::{ChangeEvent, DecodeError};
pub use resolver::{QueryResolver, RefusedHandler};
pub use server::DnsServer;
pub use state::ZoneStore;
