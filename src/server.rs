//! DNS server setup and lifecycle management.

use async_nats::ConnectOptions;
use hickory_server::ServerFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::DnsConfig;
use crate::error::DnsError;
use crate::resolver::{QueryResolver, RefusedHandler};
use crate::state::ZoneStore;
use crate::subscription::FeedSubscriber;

/// TCP request timeout passed to hickory.
const TCP_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval for emitting state metrics.
const METRICS_INTERVAL: Duration = Duration::from_secs(10);

/// Periodically emit state metrics.
async fn metrics_loop(store: ZoneStore, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(METRICS_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                store.emit_metrics();
                debug!(
                    zones = store.zone_count(),
                    records = store.record_count(),
                    ready = store.is_ready(),
                    "emitted state metrics"
                );
            }
            _ = shutdown.cancelled() => {
                debug!("metrics loop shutting down");
                return;
            }
        }
    }
}

/// Authoritative DNS server fed by the change-event stream.
pub struct DnsServer {
    config: DnsConfig,
    store: ZoneStore,
}

impl DnsServer {
    /// Create a new DNS server, validating and loading the seed table.
    /// Fails when a seed record carries an invalid address literal.
    pub fn new(config: DnsConfig) -> Result<Self, DnsError> {
        let store = ZoneStore::from_seed(&config.zones)?;
        Ok(Self { config, store })
    }

    /// Get a reference to the zone store.
    pub fn store(&self) -> &ZoneStore {
        &self.store
    }

    /// Run the DNS server until `shutdown` is cancelled.
    ///
    /// Queries are served immediately: seed records answer positively while
    /// the store is still syncing, and misses are reported as SERVFAIL until
    /// the feed subscription is established.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), DnsError> {
        info!(
            listen_addr = %self.config.listen_addr,
            nats_url = %self.config.nats_url,
            subject = %self.config.subject,
            zones = self.store.zone_count(),
            records = self.store.record_count(),
            "Starting streamdns server"
        );

        // Connect to the feed. The client keeps reconnecting on its own if
        // the broker is unavailable, so startup does not hard-fail on a
        // transient outage.
        let options = match &self.config.nats_creds {
            Some(path) => ConnectOptions::with_credentials_file(path).await?,
            None => ConnectOptions::new(),
        };
        let client = options
            .retry_on_initial_connect()
            .connect(&self.config.nats_url)
            .await?;

        // Start the feed subscriber
        let subscriber = FeedSubscriber::new(
            client,
            self.config.subject.clone(),
            self.store.clone(),
        );
        let sub_shutdown = shutdown.clone();
        let sub_handle = tokio::spawn(async move {
            subscriber.run(sub_shutdown).await;
        });

        // Create the resolver chain
        let resolver = QueryResolver::new(
            Arc::new(self.config.clone()),
            self.store.clone(),
            RefusedHandler,
        );
        let mut server = ServerFuture::new(resolver);

        // Bind UDP
        let udp_socket = UdpSocket::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "DNS UDP listening");
        server.register_socket(udp_socket);

        // Bind TCP
        let tcp_listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "DNS TCP listening");
        server.register_listener(tcp_listener, TCP_TIMEOUT);

        info!("DNS server ready to serve queries");

        // Start metrics loop
        let metrics_store = self.store.clone();
        let metrics_shutdown = shutdown.clone();
        let metrics_handle = tokio::spawn(async move {
            metrics_loop(metrics_store, metrics_shutdown).await;
        });

        // Emit initial metrics
        self.store.emit_metrics();

        // Run server until shutdown
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("DNS server shutdown requested");
            }
            result = server.block_until_done() => {
                if let Err(e) = result {
                    error!(error = %e, "DNS server error");
                }
            }
        }

        // Wait for metrics loop to stop
        let _ = metrics_handle.await;

        // Wait for the feed subscriber to release its subscription
        info!("Waiting for feed subscriber to stop...");
        let _ = sub_handle.await;

        info!("DNS server stopped");
        Ok(())
    }
}
