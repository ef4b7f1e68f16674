//! DNS message model.
//!
//! The engine never encodes messages to the wire itself; the transport layer
//! owns framing and name compression. What the engine does need is exact
//! uncompressed size accounting, for envelope framing during zone transfers
//! and for UDP/EDNS0 response scrubbing, so every type here carries a
//! `wire_len`.

pub mod enums;
pub mod header;
pub mod question;
pub mod record;

use std::collections::HashSet;

use enums::{Opcode, RecordType, ResponseCode};
use header::Header;
use question::Question;
use record::Record;

/// Smallest payload a response is ever sized against.
pub const MIN_UDP_SIZE: usize = 512;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    pub header: Header,
    pub question: Vec<Question>,
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    pub extras: Vec<Record>,
    /// Advertised EDNS0 UDP payload size, if the peer sent an OPT record.
    pub edns_udp_size: Option<u16>,
    /// Ask the transport to compress names when encoding.
    pub compress: bool,
}

impl Message {
    /// A query for `name` of type `qtype` with a fresh message id.
    pub fn query(name: &str, qtype: RecordType) -> Self {
        let mut m = Message::default();
        m.header.id = rand::random();
        m.question.push(Question::new(name, qtype));
        m
    }

    /// A full zone transfer request for `zone`.
    pub fn axfr(zone: &str) -> Self {
        Self::query(zone, RecordType::AXFR)
    }

    /// A NOTIFY message for `zone` (RFC 1996).
    pub fn notify(zone: &str) -> Self {
        let mut m = Self::query(zone, RecordType::SOA);
        m.header.opcode = Opcode::Notify;
        m.header.authoritative = true;
        m
    }

    /// A reply skeleton mirroring the request's id, opcode, question and
    /// EDNS sizing.
    pub fn reply_to(request: &Message) -> Self {
        let mut m = Message::default();
        m.header.id = request.header.id;
        m.header.response = true;
        m.header.opcode = request.header.opcode;
        m.header.recursion_desired = request.header.recursion_desired;
        m.header.rcode = ResponseCode::NoError;
        m.question = request.question.clone();
        m.edns_udp_size = request.edns_udp_size;
        m
    }

    /// Uncompressed wire size of the whole message.
    pub fn wire_len(&self) -> usize {
        let mut len = Header::WIRE_LEN;
        len += self.question.iter().map(Question::wire_len).sum::<usize>();
        len += self.answers.iter().map(Record::wire_len).sum::<usize>();
        len += self.authorities.iter().map(Record::wire_len).sum::<usize>();
        len += self.extras.iter().map(Record::wire_len).sum::<usize>();
        if self.edns_udp_size.is_some() {
            // root name + fixed OPT header
            len += 11;
        }
        len
    }

    /// Remove duplicate records across the answer and extra sections,
    /// keeping the first occurrence. TTL differences do not make records
    /// distinct.
    pub fn dedup(&mut self) {
        let mut seen = HashSet::new();
        self.answers.retain(|record| seen.insert(record.dedup_key()));
        self.extras.retain(|record| seen.insert(record.dedup_key()));
    }

    /// Shrink the message to fit `max_size` bytes on the wire. Extras are
    /// dropped first; if answers have to go too the truncated flag is set so
    /// the client retries over TCP.
    pub fn scrub(&mut self, max_size: usize) {
        let max_size = max_size.max(MIN_UDP_SIZE);
        if self.wire_len() <= max_size {
            return;
        }
        while !self.extras.is_empty() && self.wire_len() > max_size {
            self.extras.pop();
        }
        while !self.answers.is_empty() && self.wire_len() > max_size {
            self.answers.pop();
            self.header.truncated = true;
        }
    }
}

/// Order-preserving duplicate elimination over a flat record list, used on
/// the zone transfer path where everything lives in one answer sequence.
pub fn dedup_records(records: &mut Vec<Record>) {
    let mut seen = HashSet::new();
    records.retain(|record| seen.insert(record.dedup_key()));
}

/// Normalize a name to its fully qualified lowercase form.
pub fn fqdn(name: &str) -> String {
    let mut name = name.to_ascii_lowercase();
    if !name.ends_with('.') {
        name.push('.');
    }
    name
}

/// Uncompressed wire length of a domain name: one length byte per label
/// plus the label bytes, closed by the root byte.
pub fn name_wire_len(name: &str) -> usize {
    let trimmed = name.trim_end_matches('.');
    if trimmed.is_empty() {
        return 1;
    }
    trimmed.split('.').map(|label| 1 + label.len()).sum::<usize>() + 1
}

/// True for zones under the reverse-mapping trees.
pub fn is_reverse_zone(name: &str) -> bool {
    let name = fqdn(name);
    name == "in-addr.arpa."
        || name == "ip6.arpa."
        || name.ends_with(".in-addr.arpa.")
        || name.ends_with(".ip6.arpa.")
}
