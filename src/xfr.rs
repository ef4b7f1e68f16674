//! Outgoing zone transfers (AXFR, RFC 5936).
//!
//! The record set is gathered from the directory (optionally merged with
//! whatever a fallback handler answers for the zone), bracketed by the SOA,
//! then cut into size-bounded envelopes and pushed through a bounded
//! channel to the transfer transport. The channel gives backpressure for
//! free: the engine cannot outrun the transport, and closing the channel is
//! the end-of-stream signal.

use std::mem;

use tokio::sync::mpsc;
use tracing::warn;

use crate::buffer::ResponseBuffer;
use crate::directory::Directory;
use crate::dns::enums::RecordType;
use crate::dns::record::Record;
use crate::dns::{self, Message};
use crate::error::Result;
use crate::handler::{Engine, Request};
use crate::lookup;
use crate::traits::Handler;

/// One size-bounded batch of records in a streamed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub records: Vec<Record>,
}

/// Gather the zone's full authoritative record set: the SOA first, then
/// every service projected to records, then - when fallthrough is enabled -
/// whatever the fallback handler holds for the zone.
pub(crate) async fn gather(engine: &Engine, request: &Request, zone: &str) -> Result<Vec<Record>> {
    let config = engine.config();
    let mut records = vec![lookup::soa(engine.directory(), zone, config.ttl)];
    records.extend(directory_records(engine.directory(), config.ttl));

    if config.fallthrough {
        if let Some(next) = engine.fallback() {
            merge_fallback(next.as_ref(), request, zone, &mut records).await;
        }
    }
    Ok(records)
}

/// Project every directory entry to resource records, in directory order.
/// Headless services expand to one record per endpoint address and port;
/// external-name services to a CNAME when the host is CNAME-worthy;
/// everything else to one record per declared port.
fn directory_records(dir: &dyn Directory, default_ttl: u32) -> Vec<Record> {
    let mut records = Vec::new();

    for svc in dir.list_services() {
        let ttl = if svc.ttl > 0 { svc.ttl } else { default_ttl };

        if svc.is_headless() {
            let (Some(name), Some(namespace)) = (svc.service_name(), svc.namespace()) else {
                continue;
            };
            let selector = format!("{name}.{namespace}");
            for ep in dir.list_endpoints(&selector) {
                if ep.service_name() != svc.service_name() || ep.namespace() != svc.namespace() {
                    continue;
                }
                let ttl = if ep.ttl > 0 { ep.ttl } else { default_ttl };
                let owner = ep.domain();
                for _ in &ep.ports {
                    if let Some(record) = lookup::address_record(&owner, &ep.host, ttl) {
                        records.push(record);
                    }
                }
            }
            continue;
        }

        if svc.rr_type() == RecordType::CNAME {
            records.push(Record::new(
                svc.domain(),
                ttl,
                crate::dns::record::RData::Cname(dns::fqdn(&svc.host)),
            ));
            continue;
        }

        let owner = svc.domain();
        for _ in &svc.ports {
            if let Some(record) = lookup::address_record(&owner, &svc.host, ttl) {
                records.push(record);
            }
        }
    }

    records
}

/// Capture what the fallback handler would answer for a zone transfer and
/// fold its records (minus its own SOA framing) into the gathered set. If
/// the fallback fails, the captured partial answer is discarded wholesale;
/// the base record set is never touched.
async fn merge_fallback(
    next: &dyn Handler,
    request: &Request,
    zone: &str,
    records: &mut Vec<Record>,
) {
    let synthetic = Request::new(Message::axfr(zone), request.remote);
    let mut buffer = ResponseBuffer::new(request.remote);

    match next.serve(&synthetic, &mut buffer).await {
        Err(e) => {
            warn!(
                "discarding fallback records for zone {}: {}",
                zone, e
            );
        }
        Ok(_) => {
            if let Some(captured) = buffer.take_message() {
                records.extend(
                    captured
                        .answers
                        .into_iter()
                        .filter(|record| record.rtype() != RecordType::SOA),
                );
            }
        }
    }
}

/// Cut the record sequence into envelopes and push them, in order, into the
/// hand-off channel. A record that would push a non-empty envelope past
/// `chunk_size` starts the next one; a record bigger than the threshold on
/// its own rides alone, never split. Dropping the sender on return closes
/// the stream.
pub(crate) async fn stream(records: Vec<Record>, chunk_size: usize, tx: mpsc::Sender<Envelope>) {
    let mut batch = Vec::new();
    let mut size = 0;

    for record in records {
        let len = record.wire_len();
        if !batch.is_empty() && size + len > chunk_size {
            let envelope = Envelope {
                records: mem::take(&mut batch),
            };
            if tx.send(envelope).await.is_err() {
                warn!("transfer transport closed the envelope channel mid-stream");
                return;
            }
            size = 0;
        }
        size += len;
        batch.push(record);
    }

    if !batch.is_empty() && tx.send(Envelope { records: batch }).await.is_err() {
        warn!("transfer transport closed the envelope channel before the final envelope");
    }
}
