//! Configuration types for streamdns.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// DNS server configuration.
    pub dns: DnsConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// DNS server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Address for DNS server to listen on (UDP and TCP).
    pub listen_addr: SocketAddr,

    /// URL of the NATS server delivering record change events
    /// (e.g., "tls://connect.ngs.global").
    pub nats_url: String,

    /// Optional NATS credentials file.
    #[serde(default)]
    pub nats_creds: Option<PathBuf>,

    /// Subject carrying record change events.
    #[serde(default = "default_subject")]
    pub subject: String,

    /// TTL for answered A records in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Seed record table: zone suffix -> host label -> IPv4 literal.
    /// Zones are only ever provisioned here; record events against zones
    /// missing from this table are ignored.
    #[serde(default)]
    pub zones: HashMap<String, HashMap<String, String>>,

    /// SOA record configuration.
    #[serde(default)]
    pub soa: SoaConfig,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "streamdns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_subject() -> String {
    "records.changes".to_string()
}

/// SOA (Start of Authority) record configuration.
///
/// The SOA owner is the zone suffix of the queried name; `mname` and `rname`
/// are labels joined with that suffix (e.g. `ns1.example.com.`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoaConfig {
    /// Primary nameserver label (joined with the zone suffix).
    #[serde(default = "default_mname")]
    pub mname: String,

    /// Admin mailbox label (joined with the zone suffix).
    #[serde(default = "default_rname")]
    pub rname: String,

    /// Zone serial number.
    #[serde(default = "default_serial")]
    pub serial: u32,

    /// Refresh interval in seconds.
    #[serde(default = "default_refresh")]
    pub refresh: u32,

    /// Retry interval in seconds.
    #[serde(default = "default_retry")]
    pub retry: u32,

    /// Expire time in seconds.
    #[serde(default = "default_expire")]
    pub expire: u32,

    /// Minimum TTL in seconds.
    #[serde(default = "default_minimum")]
    pub minimum: u32,
}

fn default_ttl() -> u32 {
    300
}

fn default_mname() -> String {
    "ns1".to_string()
}

fn default_rname() -> String {
    "hostmaster".to_string()
}

fn default_serial() -> u32 {
    1234567890
}

fn default_refresh() -> u32 {
    7200
}

fn default_retry() -> u32 {
    1800
}

fn default_expire() -> u32 {
    86400
}

fn default_minimum() -> u32 {
    300
}

impl Default for SoaConfig {
    fn default() -> Self {
        Self {
            mname: default_mname(),
            rname: default_rname(),
            serial: default_serial(),
            refresh: default_refresh(),
            retry: default_retry(),
            expire: default_expire(),
            minimum: default_minimum(),
        }
    }
}
