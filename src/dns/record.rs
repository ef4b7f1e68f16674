use std::net::{Ipv4Addr, Ipv6Addr};

use super::enums::{Class, RecordType};
use super::name_wire_len;

/// A single resource record. Immutable once built; the record type is
/// implied by the rdata variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Record {
    /// Fully qualified, lowercase owner name.
    pub name: String,
    pub class: Class,
    pub ttl: u32,
    pub rdata: RData,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(String),
    Ns(String),
    Ptr(String),
    Mx {
        preference: u16,
        exchange: String,
    },
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    Txt(Vec<String>),
    Soa {
        mname: String,
        rname: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
}

impl Record {
    pub fn new(name: impl Into<String>, ttl: u32, rdata: RData) -> Self {
        Self {
            name: super::fqdn(&name.into()),
            class: Class::In,
            ttl,
            rdata,
        }
    }

    pub fn rtype(&self) -> RecordType {
        match self.rdata {
            RData::A(_) => RecordType::A,
            RData::Aaaa(_) => RecordType::AAAA,
            RData::Cname(_) => RecordType::CNAME,
            RData::Ns(_) => RecordType::NS,
            RData::Ptr(_) => RecordType::PTR,
            RData::Mx { .. } => RecordType::MX,
            RData::Srv { .. } => RecordType::SRV,
            RData::Txt(_) => RecordType::TXT,
            RData::Soa { .. } => RecordType::SOA,
        }
    }

    /// Uncompressed wire size of the whole record: owner name, the ten
    /// fixed header bytes (type, class, ttl, rdlength) and the rdata.
    pub fn wire_len(&self) -> usize {
        name_wire_len(&self.name) + 10 + self.rdata.wire_len()
    }

    /// Identity used for duplicate elimination: owner and rdata, TTL ignored.
    pub(crate) fn dedup_key(&self) -> Record {
        Record {
            name: self.name.to_ascii_lowercase(),
            class: self.class,
            ttl: 0,
            rdata: self.rdata.clone(),
        }
    }
}

impl RData {
    pub fn wire_len(&self) -> usize {
        match self {
            RData::A(_) => 4,
            RData::Aaaa(_) => 16,
            RData::Cname(target) | RData::Ns(target) | RData::Ptr(target) => {
                name_wire_len(target)
            }
            RData::Mx { exchange, .. } => 2 + name_wire_len(exchange),
            RData::Srv { target, .. } => 6 + name_wire_len(target),
            RData::Txt(strings) => strings.iter().map(|s| 1 + s.len()).sum(),
            RData::Soa { mname, rname, .. } => name_wire_len(mname) + name_wire_len(rname) + 20,
        }
    }
}
