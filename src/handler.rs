//! Query dispatch: zone matching, per-type lookups, negative answers and
//! hand-off to the zone transfer engine.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::Config;
use crate::directory::Directory;
use crate::dns::enums::{RecordType, ResponseCode};
use crate::dns::record::Record;
use crate::dns::{self, Message, MIN_UDP_SIZE, dedup_records};
use crate::error::{EngineError, Result};
use crate::traits::{Handler, NotifyTransport, ResponseWriter, TransferTransport};
use crate::{lookup, notify, xfr};

/// Capacity of the envelope hand-off channel. One is enough: the transport
/// consumes as it writes and the channel exists for backpressure, not
/// buffering.
const ENVELOPE_CHANNEL_CAPACITY: usize = 1;

/// An inbound query plus the transport metadata the engine cares about.
#[derive(Clone, Debug)]
pub struct Request {
    pub msg: Message,
    pub remote: SocketAddr,
}

impl Request {
    pub fn new(msg: Message, remote: SocketAddr) -> Self {
        Self { msg, remote }
    }

    /// Normalized name of the first question, `.` when there is none.
    pub fn qname(&self) -> String {
        self.msg
            .question
            .first()
            .map(|q| dns::fqdn(&q.name))
            .unwrap_or_else(|| ".".to_string())
    }

    pub fn qtype(&self) -> RecordType {
        self.msg
            .question
            .first()
            .map(|q| q.qtype)
            .unwrap_or_default()
    }

    /// Response budget in bytes: the advertised EDNS0 payload size, floored
    /// at the classic 512-byte minimum.
    pub fn max_size(&self) -> usize {
        match self.msg.edns_udp_size {
            Some(size) => (size as usize).max(MIN_UDP_SIZE),
            None => MIN_UDP_SIZE,
        }
    }
}

/// The authoritative answer engine. Configuration-scoped and immutable:
/// reconfiguration means building a new instance.
pub struct Engine {
    config: Config,
    directory: Arc<dyn Directory>,
    fallback: Option<Arc<dyn Handler>>,
    transfer: Option<Arc<dyn TransferTransport>>,
    notify: Option<Arc<dyn NotifyTransport>>,
}

impl Engine {
    /// Build an engine from a resolved configuration. Collaborator seams
    /// (fallback chain, transports) attach through the `with_` builders.
    pub fn new(mut config: Config, directory: Arc<dyn Directory>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            directory,
            fallback: None,
            transfer: None,
            notify: None,
        })
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn Handler>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_transfer_transport(mut self, transport: Arc<dyn TransferTransport>) -> Self {
        self.transfer = Some(transport);
        self
    }

    pub fn with_notify_transport(mut self, transport: Arc<dyn NotifyTransport>) -> Self {
        self.notify = Some(transport);
        self
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    pub(crate) fn fallback(&self) -> Option<&Arc<dyn Handler>> {
        self.fallback.as_ref()
    }

    /// Kick off the startup NOTIFY broadcast for the primary zone. Returns
    /// the detached task handle, or None when nothing is configured to be
    /// notified.
    pub fn start_notify(&self) -> Option<tokio::task::JoinHandle<()>> {
        if self.config.transfer_to.is_empty() {
            return None;
        }
        let transport = self.notify.as_ref()?.clone();
        let index = self.config.primary_zone_index()?;
        Some(notify::broadcast(
            self.config.zones[index].clone(),
            self.config.transfer_to.clone(),
            transport,
        ))
    }

    /// Longest-suffix match of `qname` against the configured zones.
    fn match_zone(&self, qname: &str) -> Option<&str> {
        let mut best: Option<&str> = None;
        for zone in self.config.zones.iter().map(String::as_str) {
            let matches = zone == "." || qname == zone || qname.ends_with(&format!(".{zone}"));
            if matches && best.is_none_or(|b| zone.len() > b.len()) {
                best = Some(zone);
            }
        }
        best
    }

    /// Negative answer: the given rcode with the zone SOA in the authority
    /// section, so resolvers can cache the denial.
    async fn negative_reply(
        &self,
        request: &Request,
        writer: &mut dyn ResponseWriter,
        zone: &str,
        rcode: ResponseCode,
    ) -> Result<ResponseCode> {
        let mut reply = Message::reply_to(&request.msg);
        reply.header.authoritative = true;
        reply.header.rcode = rcode;
        reply
            .authorities
            .push(lookup::soa(self.directory(), zone, self.config.ttl));
        writer.write_msg(reply).await?;
        Ok(rcode)
    }

    /// Full zone transfer: gather, bracket with the SOA, then stream
    /// envelopes to the transfer transport and hand the connection over.
    async fn serve_transfer(
        &self,
        request: &Request,
        writer: &mut dyn ResponseWriter,
        zone: &str,
    ) -> Result<ResponseCode> {
        let Some(transport) = &self.transfer else {
            return Err(EngineError::Transport(
                "no transfer transport configured".to_string(),
            ));
        };

        let mut records = xfr::gather(self, request, zone).await?;
        dedup_records(&mut records);
        let Some(soa) = records.first().cloned() else {
            return Err(EngineError::Directory(format!(
                "zone {zone} has no records to transfer"
            )));
        };
        records.push(soa);

        info!(
            "outgoing transfer of {} records of zone {} to {} started",
            records.len(),
            zone,
            request.remote
        );

        let (tx, rx) = mpsc::channel(ENVELOPE_CHANNEL_CAPACITY);
        transport.transfer_out(Message::reply_to(&request.msg), rx);
        tokio::spawn(xfr::stream(records, self.config.chunk_size, tx));

        // the transport owns the connection from here on
        writer.hijack();
        Ok(ResponseCode::NoError)
    }
}

#[async_trait]
impl Handler for Engine {
    async fn serve(
        &self,
        request: &Request,
        writer: &mut dyn ResponseWriter,
    ) -> Result<ResponseCode> {
        if request.msg.question.is_empty() {
            return Err(EngineError::InvalidQuery(
                "missing question section".to_string(),
            ));
        }
        let qname = request.qname();
        let qtype = request.qtype();

        let Some(zone) = self.match_zone(&qname) else {
            debug!("no zone matches {}, passing through", qname);
            return match &self.fallback {
                Some(next) => next.serve(request, writer).await,
                None => Err(EngineError::NoFallback),
            };
        };
        let zone = zone.to_string();

        if !self.directory.has_synced() {
            return Err(EngineError::Directory(format!(
                "directory has not synced, refusing query for {qname}"
            )));
        }

        if qtype == RecordType::AXFR {
            return self.serve_transfer(request, writer, &zone).await;
        }

        let dir = self.directory();
        let ttl = self.config.ttl;
        let looked: Result<(Vec<Record>, Vec<Record>)> = match qtype {
            RecordType::A => lookup::a(dir, &zone, &qname, ttl).map(|r| (r, Vec::new())),
            RecordType::AAAA => lookup::aaaa(dir, &zone, &qname, ttl).map(|r| (r, Vec::new())),
            RecordType::TXT => lookup::txt(dir, &zone, &qname, ttl).map(|r| (r, Vec::new())),
            RecordType::CNAME => lookup::cname(dir, &zone, &qname, ttl).map(|r| (r, Vec::new())),
            RecordType::PTR => lookup::ptr(dir, &qname, ttl).map(|r| (r, Vec::new())),
            RecordType::MX => lookup::mx(dir, &zone, &qname, ttl),
            RecordType::SRV => lookup::srv(dir, &zone, &qname, ttl),
            RecordType::SOA => Ok((vec![lookup::soa(dir, &zone, ttl)], Vec::new())),
            RecordType::NS if qname == zone => Ok(lookup::ns(&zone, ttl)),
            // NS below the apex: answer with the full authoritative set,
            // same gathering as a transfer but in a single message
            RecordType::NS => xfr::gather(self, request, &zone)
                .await
                .map(|r| (r, Vec::new())),
            // existence probe only, to tell NXDOMAIN from NODATA
            _ => lookup::a(dir, &zone, &qname, ttl).map(|_| (Vec::new(), Vec::new())),
        };

        let (records, extra) = match looked {
            Err(e) if e.is_name_error() => {
                if self.config.fallthrough {
                    if let Some(next) = &self.fallback {
                        debug!("{} not in directory, falling through", qname);
                        return next.serve(request, writer).await;
                    }
                }
                return self
                    .negative_reply(request, writer, &zone, ResponseCode::NameError)
                    .await;
            }
            Err(e) => return Err(e),
            Ok(found) => found,
        };

        if records.is_empty() {
            return self
                .negative_reply(request, writer, &zone, ResponseCode::NoError)
                .await;
        }

        let mut reply = Message::reply_to(&request.msg);
        reply.header.authoritative = true;
        reply.header.recursion_available = true;
        reply.compress = true;
        reply.answers.extend(records);
        reply.extras.extend(extra);
        reply.dedup();
        reply.scrub(request.max_size());
        writer.write_msg(reply).await?;
        Ok(ResponseCode::NoError)
    }
}
