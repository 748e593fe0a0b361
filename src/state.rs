//! In-memory zone/record store mutated by the change-event feed.
//!
//! Name resolution is single-level: a query name is split at the first label
//! boundary into a host label and a zone suffix, and the suffix is looked up
//! verbatim. `a.b.example.com.` is host `a` in zone `b.example.com.`, not a
//! walk down successive suffixes.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::debug;

use crate::error::DnsError;
use crate::metrics;

/// Canonical form of a DNS name: ASCII-lowercase with a trailing dot.
pub fn canonical_name(name: &str) -> String {
    let mut name = name.to_ascii_lowercase();
    if !name.ends_with('.') {
        name.push('.');
    }
    name
}

/// Split a canonical name at the first label boundary into (host, zone).
///
/// The zone part is everything after the first dot, kept verbatim. Returns
/// `None` for names without a label boundary.
fn split_host_zone(name: &str) -> Option<(&str, &str)> {
    name.split_once('.')
}

#[derive(Debug, Default)]
struct Zone {
    /// host label -> address. Only A records are supported.
    records: HashMap<String, Ipv4Addr>,
}

/// Thread-safe zone/record store shared between the feed subscriber (writer)
/// and concurrent query handlers (readers).
#[derive(Debug, Clone, Default)]
pub struct ZoneStore {
    inner: Arc<RwLock<StoreInner>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    /// zone suffix (canonical, trailing dot) -> Zone
    zones: HashMap<String, Zone>,

    /// True once the feed subscription is established. Monotonic: a later
    /// feed disconnect does not revert it, so transient broker blips never
    /// flap answers between NXDOMAIN and SERVFAIL.
    ready: bool,
}

impl ZoneStore {
    /// Create an empty store with no zones, in the syncing state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from the seed table (zone -> host label -> address
    /// literal). Zone names and host labels are canonicalized; an address
    /// literal that does not parse as IPv4 fails startup.
    pub fn from_seed(seed: &HashMap<String, HashMap<String, String>>) -> Result<Self, DnsError> {
        let mut zones = HashMap::with_capacity(seed.len());

        for (zone_name, hosts) in seed {
            let zone_name = canonical_name(zone_name);
            let mut zone = Zone::default();
            for (host, value) in hosts {
                let addr: Ipv4Addr = value.parse().map_err(|source| DnsError::Seed {
                    zone: zone_name.clone(),
                    host: host.clone(),
                    value: value.clone(),
                    source,
                })?;
                zone.records.insert(host.to_ascii_lowercase(), addr);
            }
            zones.insert(zone_name, zone);
        }

        Ok(Self {
            inner: Arc::new(RwLock::new(StoreInner {
                zones,
                ready: false,
            })),
        })
    }

    /// Look up the A record for a query name. Returns `None` when either the
    /// zone suffix or the host label is unknown.
    pub fn lookup_a(&self, name: &str) -> Option<Ipv4Addr> {
        let name = canonical_name(name);
        let (host, zone) = split_host_zone(&name)?;

        let inner = self.inner.read();
        inner.zones.get(zone)?.records.get(host).copied()
    }

    /// Insert or overwrite the record for `name`. Returns `false` when the
    /// zone suffix is not part of the store; unknown zones are never created
    /// implicitly (zones are provisioned out-of-band).
    pub fn upsert_record(&self, name: &str, addr: Ipv4Addr) -> bool {
        let name = canonical_name(name);
        let Some((host, zone_name)) = split_host_zone(&name) else {
            return false;
        };

        let mut inner = self.inner.write();
        match inner.zones.get_mut(zone_name) {
            Some(zone) => {
                debug!(host, zone = zone_name, %addr, "upserting record");
                zone.records.insert(host.to_string(), addr);
                true
            }
            None => false,
        }
    }

    /// Remove the record for `name` if present. Idempotent: removing an
    /// absent record is a no-op. Returns `false` when the zone suffix is not
    /// part of the store.
    pub fn remove_record(&self, name: &str) -> bool {
        let name = canonical_name(name);
        let Some((host, zone_name)) = split_host_zone(&name) else {
            return false;
        };

        let mut inner = self.inner.write();
        match inner.zones.get_mut(zone_name) {
            Some(zone) => {
                if zone.records.remove(host).is_some() {
                    debug!(host, zone = zone_name, "removed record");
                }
                true
            }
            None => false,
        }
    }

    /// Whether the store has completed initial synchronization with the feed.
    pub fn is_ready(&self) -> bool {
        self.inner.read().ready
    }

    /// Mark initial synchronization complete. Idempotent; there is no
    /// reverse transition.
    pub fn mark_ready(&self) {
        let mut inner = self.inner.write();
        if !inner.ready {
            inner.ready = true;
            debug!("zone store marked ready");
        }
    }

    /// Number of zones in the store.
    pub fn zone_count(&self) -> usize {
        self.inner.read().zones.len()
    }

    /// Total number of records across all zones.
    pub fn record_count(&self) -> usize {
        self.inner.read().zones.values().map(|z| z.records.len()).sum()
    }

    /// Emit current state metrics.
    pub fn emit_metrics(&self) {
        let inner = self.inner.read();
        let records = inner.zones.values().map(|z| z.records.len()).sum();
        metrics::record_state_counts(inner.zones.len(), records);
        metrics::record_ready_state(inner.ready);
    }
}
