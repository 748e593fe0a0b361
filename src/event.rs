//! Change-event envelope and body decoding.
//!
//! Every feed message carries its event type and schema version out-of-band
//! in message headers; the body is JSON shaped per type. Anything that fails
//! validation is rejected here, before any state is touched.

use async_nats::HeaderMap;
use serde::Deserialize;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Header naming the event type.
pub const EVENT_TYPE_HEADER: &str = "X-EventType";

/// Header naming the event schema version.
pub const EVENT_VERSION_HEADER: &str = "X-EventVersion";

/// The single supported event schema version. There is no multi-version
/// negotiation: anything else is dropped.
pub const EVENT_VERSION: &str = "2024-09-23";

/// A validated record-mutation event from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Insert or overwrite an A record.
    Upsert {
        /// Fully-qualified record name.
        name: String,
        /// Validated IPv4 address.
        addr: Ipv4Addr,
        /// TTL carried by the event. Answers currently use the configured
        /// TTL instead; the value is kept for logging.
        ttl: u32,
    },
    /// Remove a record.
    Delete {
        /// Fully-qualified record name.
        name: String,
    },
    /// A bulk snapshot is retrievable out-of-band. Only the occurrence is
    /// recorded; fetching and applying the snapshot is not implemented.
    SnapshotAvailable {
        /// Where the snapshot can be fetched from.
        url: String,
    },
}

/// Body of `UpsertRecord` events.
#[derive(Debug, Deserialize)]
struct RecordBody {
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    value: String,
    #[serde(default)]
    ttl: u32,
}

/// Body of `DeleteRecord` events. Upsert-shaped extra fields are ignored.
#[derive(Debug, Deserialize)]
struct DeleteBody {
    name: String,
}

/// Body of `SnapshotAvailable` events.
#[derive(Debug, Deserialize)]
struct SnapshotBody {
    url: String,
}

/// Reasons an incoming feed message is dropped without mutating state.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The envelope has no event-type header.
    #[error("event missing {EVENT_TYPE_HEADER} header")]
    MissingEventType,

    /// The envelope has no event-version header.
    #[error("event missing {EVENT_VERSION_HEADER} header")]
    MissingEventVersion,

    /// The envelope version does not match [`EVENT_VERSION`].
    #[error("unsupported event version: {0:?}")]
    UnsupportedVersion(String),

    /// The envelope names an event type this responder does not know.
    #[error("unknown event type: {0:?}")]
    UnknownEventType(String),

    /// The body is not valid JSON of the expected shape.
    #[error("malformed event body: {0}")]
    Body(#[from] serde_json::Error),

    /// An upsert for a record type other than A.
    #[error("unsupported record type: {0:?}")]
    UnsupportedRecordType(String),

    /// An upsert whose value is not an IPv4 literal.
    #[error("invalid address value {value:?}: {source}")]
    InvalidAddress {
        /// The offending value.
        value: String,
        /// Underlying parse error.
        source: std::net::AddrParseError,
    },
}

impl DecodeError {
    /// Stable label for the drop-reason metric.
    pub fn reason(&self) -> &'static str {
        match self {
            DecodeError::MissingEventType => "missing_event_type",
            DecodeError::MissingEventVersion => "missing_event_version",
            DecodeError::UnsupportedVersion(_) => "unsupported_version",
            DecodeError::UnknownEventType(_) => "unknown_event_type",
            DecodeError::Body(_) => "malformed_body",
            DecodeError::UnsupportedRecordType(_) => "unsupported_record_type",
            DecodeError::InvalidAddress { .. } => "invalid_address",
        }
    }
}

impl ChangeEvent {
    /// Validate the envelope headers and decode the body into an event.
    pub fn decode(headers: Option<&HeaderMap>, payload: &[u8]) -> Result<Self, DecodeError> {
        let event_type = headers
            .and_then(|h| h.get(EVENT_TYPE_HEADER))
            .ok_or(DecodeError::MissingEventType)?
            .as_str();

        let version = headers
            .and_then(|h| h.get(EVENT_VERSION_HEADER))
            .ok_or(DecodeError::MissingEventVersion)?
            .as_str();
        if version != EVENT_VERSION {
            return Err(DecodeError::UnsupportedVersion(version.to_string()));
        }

        match event_type {
            "UpsertRecord" => {
                let body: RecordBody = serde_json::from_slice(payload)?;
                if body.record_type != "A" {
                    return Err(DecodeError::UnsupportedRecordType(body.record_type));
                }
                let addr = body
                    .value
                    .parse()
                    .map_err(|source| DecodeError::InvalidAddress {
                        value: body.value,
                        source,
                    })?;
                Ok(ChangeEvent::Upsert {
                    name: body.name,
                    addr,
                    ttl: body.ttl,
                })
            }
            "DeleteRecord" => {
                let body: DeleteBody = serde_json::from_slice(payload)?;
                Ok(ChangeEvent::Delete { name: body.name })
            }
            "SnapshotAvailable" => {
                let body: SnapshotBody = serde_json::from_slice(payload)?;
                Ok(ChangeEvent::SnapshotAvailable { url: body.url })
            }
            other => Err(DecodeError::UnknownEventType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(event_type: &str, version: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(EVENT_TYPE_HEADER, event_type);
        headers.insert(EVENT_VERSION_HEADER, version);
        headers
    }

    #[test]
    fn test_decode_upsert() {
        let h = headers("UpsertRecord", EVENT_VERSION);
        let body = br#"{"name": "three.example.com.", "type": "A", "value": "3.3.3.3", "ttl": 60}"#;

        let event = ChangeEvent::decode(Some(&h), body).unwrap();
        assert_eq!(
            event,
            ChangeEvent::Upsert {
                name: "three.example.com.".to_string(),
                addr: "3.3.3.3".parse().unwrap(),
                ttl: 60,
            }
        );
    }

    #[test]
    fn test_decode_upsert_without_ttl() {
        let h = headers("UpsertRecord", EVENT_VERSION);
        let body = br#"{"name": "three.example.com.", "type": "A", "value": "3.3.3.3"}"#;
        assert!(ChangeEvent::decode(Some(&h), body).is_ok());
    }

    #[test]
    fn test_decode_delete_ignores_record_fields() {
        let h = headers("DeleteRecord", EVENT_VERSION);
        let body = br#"{"name": "one.example.com.", "type": "A", "value": "1.1.1.1", "ttl": 60}"#;

        let event = ChangeEvent::decode(Some(&h), body).unwrap();
        assert_eq!(
            event,
            ChangeEvent::Delete {
                name: "one.example.com.".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_snapshot_available() {
        let h = headers("SnapshotAvailable", EVENT_VERSION);
        let body = br#"{"url": "https://snapshots.example.com/records.json"}"#;

        let event = ChangeEvent::decode(Some(&h), body).unwrap();
        assert_eq!(
            event,
            ChangeEvent::SnapshotAvailable {
                url: "https://snapshots.example.com/records.json".to_string(),
            }
        );
    }

    #[test]
    fn test_no_headers_is_missing_type() {
        let body = br#"{"name": "one.example.com."}"#;
        let err = ChangeEvent::decode(None, body).unwrap_err();
        assert!(matches!(err, DecodeError::MissingEventType));
    }

    #[test]
    fn test_missing_type_header() {
        let mut h = HeaderMap::new();
        h.insert(EVENT_VERSION_HEADER, EVENT_VERSION);
        let err = ChangeEvent::decode(Some(&h), b"{}").unwrap_err();
        assert!(matches!(err, DecodeError::MissingEventType));
    }

    #[test]
    fn test_missing_version_header() {
        let mut h = HeaderMap::new();
        h.insert(EVENT_TYPE_HEADER, "UpsertRecord");
        let err = ChangeEvent::decode(Some(&h), b"{}").unwrap_err();
        assert!(matches!(err, DecodeError::MissingEventVersion));
    }

    #[test]
    fn test_version_mismatch() {
        let h = headers("UpsertRecord", "2023-01-01");
        let body = br#"{"name": "one.example.com.", "type": "A", "value": "1.1.1.1"}"#;
        let err = ChangeEvent::decode(Some(&h), body).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion(v) if v == "2023-01-01"));
    }

    #[test]
    fn test_unknown_event_type() {
        let h = headers("TruncateZone", EVENT_VERSION);
        let err = ChangeEvent::decode(Some(&h), b"{}").unwrap_err();
        assert!(matches!(err, DecodeError::UnknownEventType(t) if t == "TruncateZone"));
    }

    #[test]
    fn test_malformed_body() {
        let h = headers("UpsertRecord", EVENT_VERSION);
        let err = ChangeEvent::decode(Some(&h), b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::Body(_)));
    }

    #[test]
    fn test_upsert_non_a_type_rejected() {
        let h = headers("UpsertRecord", EVENT_VERSION);
        let body = br#"{"name": "one.example.com.", "type": "AAAA", "value": "fd00::1"}"#;
        let err = ChangeEvent::decode(Some(&h), body).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedRecordType(t) if t == "AAAA"));
    }

    #[test]
    fn test_upsert_invalid_address_rejected() {
        let h = headers("UpsertRecord", EVENT_VERSION);
        let body = br#"{"name": "one.example.com.", "type": "A", "value": "999.0.0.1"}"#;
        let err = ChangeEvent::decode(Some(&h), body).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidAddress { value, .. } if value == "999.0.0.1"));
    }

    #[test]
    fn test_upsert_ipv6_value_rejected() {
        let h = headers("UpsertRecord", EVENT_VERSION);
        let body = br#"{"name": "one.example.com.", "type": "A", "value": "fd00::1"}"#;
        assert!(matches!(
            ChangeEvent::decode(Some(&h), body),
            Err(DecodeError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_drop_reasons_are_stable() {
        assert_eq!(DecodeError::MissingEventType.reason(), "missing_event_type");
        assert_eq!(
            DecodeError::UnsupportedVersion("x".into()).reason(),
            "unsupported_version"
        );
    }
}
