//! streamdns binary entry point.

use clap::Parser;
use std::path::PathBuf;
use streamdns::{telemetry, Config, DnsServer};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Authoritative DNS server driven by a streaming change-event feed.
#[derive(Parser, Debug)]
#[command(name = "streamdns")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML).
    #[arg(short, long, default_value = "streamdns.toml")]
    config: PathBuf,
}

/// Cancel the token on SIGINT or SIGTERM.
async fn signal_listener(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
            _ = sigterm.recv() => info!("received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received interrupt");
    }

    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config: Config = config::Config::builder()
        .add_source(config::File::from(args.config.clone()))
        .add_source(
            config::Environment::with_prefix("STREAMDNS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = %args.config.display(),
        listen_addr = %config.dns.listen_addr,
        nats_url = %config.dns.nats_url,
        "Starting streamdns"
    );

    // Setup graceful shutdown
    let shutdown = CancellationToken::new();
    tokio::spawn(signal_listener(shutdown.clone()));

    // Seed validation happens here, before anything is bound or served.
    let server = DnsServer::new(config.dns)?;
    let result = server.run(shutdown).await;

    if let Err(e) = result {
        error!(error = %e, "DNS server error");
        return Err(e.into());
    }

    info!("streamdns shutdown complete");
    Ok(())
}
