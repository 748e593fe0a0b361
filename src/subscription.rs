//! Feed subscriber: consumes record change events and applies them to the
//! zone store.

use async_nats::{Client, HeaderMap, Message};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::event::ChangeEvent;
use crate::metrics::{self, EventKind, ReconnectReason};
use crate::state::ZoneStore;

/// Decode one feed message (envelope headers plus body bytes) and apply it to
/// the store. Malformed messages are logged and dropped; a bad event never
/// aborts ingestion and never touches existing records.
pub fn ingest(store: &ZoneStore, headers: Option<&HeaderMap>, payload: &[u8]) {
    match ChangeEvent::decode(headers, payload) {
        Ok(event) => apply(store, event),
        Err(e) => {
            warn!(error = %e, "dropping change event");
            metrics::record_event_dropped(e.reason());
        }
    }
}

/// Dispatch a validated event to the matching store operation.
fn apply(store: &ZoneStore, event: ChangeEvent) {
    match event {
        ChangeEvent::Upsert { name, addr, ttl } => {
            if store.upsert_record(&name, addr) {
                debug!(name, %addr, ttl, "applied record upsert");
                metrics::record_event_applied(EventKind::Upsert);
            } else {
                debug!(name, "upsert for unknown zone ignored");
                metrics::record_event_ignored(EventKind::Upsert);
            }
        }
        ChangeEvent::Delete { name } => {
            if store.remove_record(&name) {
                debug!(name, "applied record delete");
                metrics::record_event_applied(EventKind::Delete);
            } else {
                debug!(name, "delete for unknown zone ignored");
                metrics::record_event_ignored(EventKind::Delete);
            }
        }
        ChangeEvent::SnapshotAvailable { url } => {
            // Bulk snapshot loading is handled out-of-band; only record that
            // the snapshot was announced.
            info!(url, "snapshot available");
            metrics::record_event_applied(EventKind::Snapshot);
        }
    }
}

/// Subscribes to the change-event subject and keeps the store current.
pub struct FeedSubscriber {
    client: Client,
    subject: String,
    store: ZoneStore,
}

impl FeedSubscriber {
    /// Create a new subscriber over an established feed client.
    pub fn new(client: Client, subject: String, store: ZoneStore) -> Self {
        Self {
            client,
            subject,
            store,
        }
    }

    /// Run the subscribe/receive loop until `shutdown` is cancelled.
    ///
    /// Subscribe failures and ended streams are retried with exponential
    /// backoff (transport-level reconnects are handled inside the client).
    /// The store is marked ready on the first successful subscription: the
    /// seed table is the consistent snapshot, and from that point on events
    /// arrive in delivery order.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut backoff_secs = 1u64;
        const MAX_BACKOFF: u64 = 30;
        let mut first_connect = true;

        loop {
            if shutdown.is_cancelled() {
                info!("feed subscriber shutting down");
                return;
            }

            info!(subject = %self.subject, "subscribing to change feed");

            let mut sub = match self.client.subscribe(self.subject.clone()).await {
                Ok(sub) => {
                    backoff_secs = 1;
                    if first_connect {
                        metrics::record_feed_reconnect(ReconnectReason::InitialConnect);
                        first_connect = false;
                    }
                    sub
                }
                Err(e) => {
                    error!(error = %e, "failed to subscribe to change feed");
                    metrics::record_feed_reconnect(ReconnectReason::SubscribeError);
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = sleep(Duration::from_secs(backoff_secs)) => {}
                    }
                    backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF);
                    continue;
                }
            };

            self.store.mark_ready();

            let mut shutting_down = false;
            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => {
                        shutting_down = true;
                        break;
                    }

                    msg = sub.next() => {
                        match msg {
                            Some(msg) => Self::handle_message(&self.store, msg),
                            None => {
                                warn!("change feed stream ended");
                                metrics::record_feed_reconnect(ReconnectReason::StreamEnded);
                                break;
                            }
                        }
                    }
                }
            }

            if shutting_down {
                info!("feed subscriber received shutdown signal");
                let _ = sub.unsubscribe().await;
                return;
            }

            // Brief delay before resubscribing
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = sleep(Duration::from_secs(1)) => {}
            }
        }
    }

    fn handle_message(store: &ZoneStore, msg: Message) {
        ingest(store, msg.headers.as_ref(), &msg.payload);
    }
}
