//! Shared test infrastructure for resolver integration tests.

use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncoder};
use hickory_server::authority::{MessageRequest, MessageResponse};
use hickory_server::proto::rr::Record;
use hickory_server::proto::xfer::Protocol;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

use streamdns::config::{DnsConfig, SoaConfig};
use streamdns::resolver::{QueryResolver, RefusedHandler};
use streamdns::state::ZoneStore;

// --- TestResponseHandler ---

/// Captures the serialized DNS response for inspection in tests.
///
/// Implements `ResponseHandler` so it can be passed to
/// `RequestHandler::handle_request()`. The response is serialized via
/// `MessageResponse::destructive_emit()` and stored as raw wire-format bytes,
/// which can then be parsed with `Message::from_vec()`.
#[derive(Clone)]
pub struct TestResponseHandler {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::with_capacity(512))),
        }
    }

    /// Parse the captured wire bytes into a `Message` for assertions.
    pub fn into_message(self) -> Message {
        let buf = self.buf.lock().unwrap();
        assert!(!buf.is_empty(), "no response was captured");
        Message::from_vec(&buf).expect("failed to parse captured DNS response")
    }
}

#[async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let mut buf = self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(&mut *buf);
        encoder.set_max_size(u16::MAX);
        let info = response
            .destructive_emit(&mut encoder)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(info)
    }
}

// --- Seed/config builders ---

/// Seed table matching the default zone setup: one/two/localhost in
/// `example.com.`.
pub fn seed_zones() -> HashMap<String, HashMap<String, String>> {
    let mut hosts = HashMap::new();
    hosts.insert("one".to_string(), "1.1.1.1".to_string());
    hosts.insert("two".to_string(), "2.2.2.2".to_string());
    hosts.insert("localhost".to_string(), "127.0.0.1".to_string());

    let mut zones = HashMap::new();
    zones.insert("example.com.".to_string(), hosts);
    zones
}

pub fn test_dns_config() -> DnsConfig {
    DnsConfig {
        listen_addr: "127.0.0.1:5353".parse().unwrap(),
        nats_url: "nats://127.0.0.1:4222".to_string(),
        nats_creds: None,
        subject: "records.changes".to_string(),
        ttl: 300,
        zones: seed_zones(),
        soa: SoaConfig::default(),
    }
}

/// Store seeded from [`seed_zones`], still in the syncing state.
pub fn seeded_store() -> ZoneStore {
    ZoneStore::from_seed(&seed_zones()).expect("seed table must be valid")
}

/// Store seeded from [`seed_zones`] and marked ready.
pub fn ready_store() -> ZoneStore {
    let store = seeded_store();
    store.mark_ready();
    store
}

/// Build the standard resolver chain over the given store.
pub fn build_resolver(store: ZoneStore) -> QueryResolver<RefusedHandler> {
    QueryResolver::new(Arc::new(test_dns_config()), store, RefusedHandler)
}

// --- Query/Request construction ---

/// Build wire-format bytes for a DNS query.
pub fn build_query_bytes(name: &str, record_type: RecordType, class: DNSClass, id: u16) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(OpCode::Query);
    msg.set_recursion_desired(true);
    let mut query = Query::new();
    query.set_name(Name::from_ascii(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(class);
    msg.add_query(query);
    msg.to_vec().unwrap()
}

/// Parse wire bytes into a MessageRequest.
pub fn parse_message_request(bytes: &[u8]) -> MessageRequest {
    let mut decoder = BinDecoder::new(bytes);
    MessageRequest::read(&mut decoder).expect("failed to parse MessageRequest")
}

/// Build a full `Request` for the given query.
pub fn build_request(name: &str, record_type: RecordType, class: DNSClass, id: u16) -> Request {
    let bytes = build_query_bytes(name, record_type, class, id);
    let msg = parse_message_request(&bytes);
    let src: SocketAddr = "127.0.0.1:54321".parse().unwrap();
    Request::new(msg, src, Protocol::Udp)
}

// --- Response helpers ---

/// Execute a query through a handler and return the parsed response.
pub async fn execute_query<H: RequestHandler>(
    handler: &H,
    name: &str,
    record_type: RecordType,
    id: u16,
) -> Message {
    execute_class_query(handler, name, record_type, DNSClass::IN, id).await
}

/// Execute a query with an explicit query class.
pub async fn execute_class_query<H: RequestHandler>(
    handler: &H,
    name: &str,
    record_type: RecordType,
    class: DNSClass,
    id: u16,
) -> Message {
    let request = build_request(name, record_type, class, id);
    let response_handler = TestResponseHandler::new();
    handler.handle_request(&request, response_handler.clone()).await;
    response_handler.into_message()
}

/// Extract A record addresses from a response.
pub fn extract_a_ips(msg: &Message) -> Vec<Ipv4Addr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(Ipv4Addr::from(*a)),
            _ => None,
        })
        .collect()
}

/// Assert response code.
pub fn assert_response_code(msg: &Message, expected: ResponseCode) {
    assert_eq!(
        msg.response_code(),
        expected,
        "expected {:?}, got {:?}",
        expected,
        msg.response_code()
    );
}

/// Assert an authoritative answer carrying exactly the expected address.
pub fn assert_a_response(msg: &Message, expected: Ipv4Addr) {
    assert_response_code(msg, ResponseCode::NoError);
    assert!(msg.authoritative(), "expected the AA flag to be set");
    assert_eq!(
        extract_a_ips(msg),
        vec![expected],
        "A records mismatch in {:?}",
        msg.answers()
    );
}

/// Assert the authority section carries a SOA for the given zone.
pub fn assert_soa_authority(msg: &Message, zone: &str) {
    let expected_owner = Name::from_ascii(zone).unwrap();
    let soa = msg
        .name_servers()
        .iter()
        .find(|r| r.record_type() == RecordType::SOA)
        .unwrap_or_else(|| panic!("no SOA in authority section: {:?}", msg.name_servers()));
    assert_eq!(soa.name(), &expected_owner, "SOA owner mismatch");
}
