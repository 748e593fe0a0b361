//! Metrics instrumentation for streamdns.
//!
//! All metrics are prefixed with `streamdns.`

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Record a DNS query.
pub fn record_query(record_type: &str, outcome: QueryOutcome, duration: std::time::Duration) {
    let outcome_str = match outcome {
        QueryOutcome::Answer => "answer",
        QueryOutcome::NxDomain => "nxdomain",
        QueryOutcome::NotReady => "not_ready",
        QueryOutcome::Delegated => "delegated",
    };

    counter!("streamdns.query.count", "type" => record_type.to_string(), "outcome" => outcome_str)
        .increment(1);
    histogram!("streamdns.query.duration.seconds", "type" => record_type.to_string())
        .record(duration.as_secs_f64());
}

/// Query outcome for metrics.
#[derive(Debug, Clone, Copy)]
pub enum QueryOutcome {
    /// Query returned a positive answer.
    Answer,
    /// Name does not exist (store is synced).
    NxDomain,
    /// Store not ready, transient failure returned.
    NotReady,
    /// Query passed through to the next handler.
    Delegated,
}

/// Feed event kinds.
#[derive(Debug, Clone, Copy)]
pub enum EventKind {
    /// UpsertRecord event.
    Upsert,
    /// DeleteRecord event.
    Delete,
    /// SnapshotAvailable event.
    Snapshot,
}

impl EventKind {
    fn as_str(self) -> &'static str {
        match self {
            EventKind::Upsert => "upsert",
            EventKind::Delete => "delete",
            EventKind::Snapshot => "snapshot",
        }
    }
}

/// Record a feed event applied to the store.
pub fn record_event_applied(kind: EventKind) {
    counter!("streamdns.feed.event.count", "event" => kind.as_str(), "outcome" => "applied")
        .increment(1);
}

/// Record a feed event ignored because its zone is not in the store.
pub fn record_event_ignored(kind: EventKind) {
    counter!("streamdns.feed.event.count", "event" => kind.as_str(), "outcome" => "ignored")
        .increment(1);
}

/// Record a feed message dropped before dispatch.
pub fn record_event_dropped(reason: &'static str) {
    counter!("streamdns.feed.dropped.count", "reason" => reason).increment(1);
}

/// Record a (re)subscribe attempt on the feed.
pub fn record_feed_reconnect(reason: ReconnectReason) {
    let reason_str = match reason {
        ReconnectReason::InitialConnect => "initial_connect",
        ReconnectReason::SubscribeError => "subscribe_error",
        ReconnectReason::StreamEnded => "stream_ended",
    };

    counter!("streamdns.feed.reconnect.count", "reason" => reason_str).increment(1);
}

/// Reconnect reasons.
#[derive(Debug, Clone, Copy)]
pub enum ReconnectReason {
    /// First successful subscription to the feed.
    InitialConnect,
    /// Subscribing to the feed failed.
    SubscribeError,
    /// The subscription stream ended.
    StreamEnded,
}

/// Record state counts (call periodically or on change).
pub fn record_state_counts(zones: usize, records: usize) {
    gauge!("streamdns.state.zones.count").set(zones as f64);
    gauge!("streamdns.state.records.count").set(records as f64);
}

/// Record readiness state.
pub fn record_ready_state(ready: bool) {
    gauge!("streamdns.state.ready").set(if ready { 1.0 } else { 0.0 });
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
