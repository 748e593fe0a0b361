//! Query resolution: answers A queries from the zone store.
//!
//! The resolver is a hickory `RequestHandler` with an explicit `next` handler
//! rather than an `Authority` inside a `Catalog`: the catalog only maps
//! NXDomain/Refused lookup errors onto responses, and this responder must be
//! able to answer SERVFAIL while the store is still syncing. Queries outside
//! its responsibility (class or type it does not serve) are passed through to
//! the next handler in the chain untouched.

use async_trait::async_trait;
use hickory_proto::op::{Header, ResponseCode};
use hickory_proto::rr::rdata::{A, SOA};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use std::iter;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, error, trace};

use crate::config::DnsConfig;
use crate::metrics::{self, QueryOutcome, Timer};
use crate::state::{canonical_name, ZoneStore};

/// Response metadata when sending fails and no response reached the wire.
fn serve_failed(request: &Request) -> ResponseInfo {
    let mut header = Header::response_from_request(request.header());
    header.set_response_code(ResponseCode::ServFail);
    header.into()
}

/// Send a REFUSED response with no records.
async fn send_refused<R: ResponseHandler>(
    request: &Request,
    mut response_handle: R,
) -> ResponseInfo {
    let mut header = Header::response_from_request(request.header());
    header.set_response_code(ResponseCode::Refused);
    let response = MessageResponseBuilder::from_message_request(request).build_no_records(header);

    match response_handle.send_response(response).await {
        Ok(info) => info,
        Err(e) => {
            error!(error = %e, "failed to send response");
            serve_failed(request)
        }
    }
}

/// Terminal handler for the resolver chain: refuses whatever reaches it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefusedHandler;

#[async_trait]
impl RequestHandler for RefusedHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        trace!(src = %request.src(), "refusing unhandled query");
        send_refused(request, response_handle).await
    }
}

/// The authority zone for a name under single-level splitting: everything
/// after the first label boundary, or the name itself when there is no
/// non-empty remainder.
fn zone_of(name: &str) -> &str {
    match name.split_once('.') {
        Some((_, zone)) if !zone.is_empty() => zone,
        _ => name,
    }
}

/// Store-backed resolver for A queries over the IN class.
pub struct QueryResolver<N> {
    config: Arc<DnsConfig>,
    store: ZoneStore,
    next: N,
}

impl<N> QueryResolver<N> {
    /// Create a resolver over the given store, delegating unhandled queries
    /// to `next`.
    pub fn new(config: Arc<DnsConfig>, store: ZoneStore, next: N) -> Self {
        Self {
            config,
            store,
            next,
        }
    }

    /// Build the answer record, echoing the queried name.
    fn build_a_record(&self, qname: Name, addr: Ipv4Addr) -> Record {
        let mut record = Record::from_rdata(qname, self.config.ttl, RData::A(A(addr)));
        record.set_dns_class(DNSClass::IN);
        record
    }

    /// Build the authority SOA record for a zone suffix. Returns `None` for
    /// suffixes that do not form a valid DNS name.
    fn build_soa_record(&self, zone: &str) -> Option<Record> {
        let soa = &self.config.soa;
        let owner = Name::from_ascii(zone).ok()?;
        let mname = Name::from_ascii(format!("{}.{}", soa.mname, zone)).ok()?;
        let rname = Name::from_ascii(format!("{}.{}", soa.rname, zone)).ok()?;

        let rdata = SOA::new(
            mname,
            rname,
            soa.serial,
            soa.refresh as i32,
            soa.retry as i32,
            soa.expire as i32,
            soa.minimum,
        );

        let mut record = Record::from_rdata(owner, soa.minimum, RData::SOA(rdata));
        record.set_dns_class(DNSClass::IN);
        Some(record)
    }
}

#[async_trait]
impl<N: RequestHandler> RequestHandler for QueryResolver<N> {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        let timer = Timer::start();

        let request_info = match request.request_info() {
            Ok(info) => info,
            Err(e) => {
                debug!(src = %request.src(), error = %e, "refusing malformed request");
                return send_refused(request, response_handle).await;
            }
        };
        let query = request_info.query;
        let rtype_str = format!("{:?}", query.query_type());

        // Only A records over the standard class are served here.
        if query.query_class() != DNSClass::IN || query.query_type() != RecordType::A {
            trace!(name = %query.name(), qtype = %rtype_str, "delegating query");
            metrics::record_query(&rtype_str, QueryOutcome::Delegated, timer.elapsed());
            return self.next.handle_request(request, response_handle).await;
        }

        let qname = query.original().name().clone();
        let name = canonical_name(&qname.to_string());

        // The store can answer from seed records even while still syncing;
        // readiness only decides how a miss is reported.
        let response = match self.store.lookup_a(&name) {
            Some(addr) => {
                debug!(name = %name, %addr, "answering A query");
                metrics::record_query(&rtype_str, QueryOutcome::Answer, timer.elapsed());

                let answers = [self.build_a_record(qname, addr)];
                let mut header = Header::response_from_request(request.header());
                header.set_authoritative(true);

                let response = MessageResponseBuilder::from_message_request(request).build(
                    header,
                    answers.iter(),
                    iter::empty(),
                    iter::empty(),
                    iter::empty(),
                );
                response_handle.send_response(response).await
            }
            None => {
                let zone = zone_of(&name);
                let authority: Vec<Record> = self.build_soa_record(zone).into_iter().collect();

                let mut header = Header::response_from_request(request.header());
                header.set_authoritative(true);
                if self.store.is_ready() {
                    debug!(name = %name, "name not found");
                    metrics::record_query(&rtype_str, QueryOutcome::NxDomain, timer.elapsed());
                    header.set_response_code(ResponseCode::NXDomain);
                } else {
                    debug!(name = %name, "store not ready, returning SERVFAIL");
                    metrics::record_query(&rtype_str, QueryOutcome::NotReady, timer.elapsed());
                    header.set_response_code(ResponseCode::ServFail);
                }

                let response = MessageResponseBuilder::from_message_request(request).build(
                    header,
                    iter::empty(),
                    iter::empty(),
                    authority.iter(),
                    iter::empty(),
                );
                response_handle.send_response(response).await
            }
        };

        match response {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "failed to send response");
                serve_failed(request)
            }
        }
    }
}
