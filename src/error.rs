//! Error types for streamdns.

use thiserror::Error;

/// Errors that can occur in the DNS server.
#[derive(Debug, Error)]
pub enum DnsError {
    /// IO error (network, file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to connect to the change-event feed
    #[error("feed connection error: {0}")]
    Connect(#[from] async_nats::ConnectError),

    /// A seed record failed address validation at startup
    #[error("invalid seed address for {host:?} in zone {zone:?}: {value:?}: {source}")]
    Seed {
        /// Zone the record belongs to.
        zone: String,
        /// Host label of the record.
        host: String,
        /// The address literal that failed to parse.
        value: String,
        /// Underlying parse error.
        source: std::net::AddrParseError,
    },
}
