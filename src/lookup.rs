//! Record-producing lookups against the directory.
//!
//! Each function here is one arm of the dispatcher's type switch: it
//! resolves the query name to concrete service entries and projects them to
//! records of one type. A name that matches no service at all surfaces as
//! `EngineError::NameNotFound` so the dispatcher can tell NXDOMAIN from
//! NODATA; a matched name with no records of the requested type returns an
//! empty vector.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::directory::{Directory, SERVICE_SEGMENT, ServiceRecord};
use crate::dns::record::{RData, Record};
use crate::dns::{self, enums::RecordType};
use crate::error::{EngineError, Result};

/// SOA refresh timer, seconds.
const SOA_REFRESH: u32 = 7200;
/// SOA retry timer, seconds.
const SOA_RETRY: u32 = 1800;
/// SOA expire timer, seconds.
const SOA_EXPIRE: u32 = 86400;

/// A service entry resolved down to one concrete (host, port) pair.
/// `owner` is the domain name derived from the entry's key; address answers
/// are written under the query name while SRV targets and their glue use
/// the owner.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub owner: String,
    pub host: String,
    pub port: u16,
    pub ttl: u32,
}

struct QueryName<'a> {
    service: &'a str,
    namespace: &'a str,
    endpoint: Option<&'a str>,
}

/// Split a query name below the zone into its service coordinates.
/// Accepted shapes: `<service>.<namespace>.svc.<zone>` and
/// `<endpoint>.<service>.<namespace>.svc.<zone>`.
fn parse_qname<'a>(zone: &str, qname: &'a str) -> Option<QueryName<'a>> {
    let rel = qname.strip_suffix(zone)?.trim_end_matches('.');
    if rel.is_empty() {
        return None;
    }
    let labels: Vec<&'a str> = rel.split('.').collect();
    match labels.as_slice() {
        [service, namespace, seg] if *seg == SERVICE_SEGMENT => Some(QueryName {
            service,
            namespace,
            endpoint: None,
        }),
        [endpoint, service, namespace, seg] if *seg == SERVICE_SEGMENT => Some(QueryName {
            service,
            namespace,
            endpoint: Some(endpoint),
        }),
        _ => None,
    }
}

/// Resolve `qname` to concrete entries. `NameNotFound` when nothing in the
/// directory answers to the name; an empty vector when the name exists but
/// carries no addressable data (a service with no ports, for instance).
pub(crate) fn match_services(
    dir: &dyn Directory,
    zone: &str,
    qname: &str,
    default_ttl: u32,
) -> Result<Vec<Entry>> {
    // the apex itself exists (it has a SOA), it just has no service data
    if qname == zone {
        return Ok(Vec::new());
    }
    let Some(query) = parse_qname(zone, qname) else {
        return Err(EngineError::NameNotFound(qname.to_string()));
    };

    let mut matched = false;
    let mut entries = Vec::new();

    for svc in dir.list_services() {
        if svc.service_name() != Some(query.service) || svc.namespace() != Some(query.namespace) {
            continue;
        }
        let ttl = entry_ttl(&svc, default_ttl);

        if svc.is_headless() {
            matched = true;
            let selector = format!("{}.{}", query.service, query.namespace);
            for ep in dir.list_endpoints(&selector) {
                if ep.service_name() != Some(query.service)
                    || ep.namespace() != Some(query.namespace)
                {
                    continue;
                }
                if let Some(want) = query.endpoint {
                    if ep.endpoint() != Some(want) {
                        continue;
                    }
                }
                let ttl = entry_ttl(&ep, default_ttl);
                let owner = ep.domain();
                push_per_port(&mut entries, owner, &ep.host, &ep.ports, ttl);
            }
            // an endpoint label that matched nothing is a missing name,
            // not an empty answer
            if query.endpoint.is_some() && entries.is_empty() {
                return Err(EngineError::NameNotFound(qname.to_string()));
            }
            continue;
        }

        // only headless services expose per-endpoint names
        if query.endpoint.is_some() {
            continue;
        }
        matched = true;

        if svc.rr_type() == RecordType::CNAME {
            entries.push(Entry {
                owner: svc.domain(),
                host: svc.host.clone(),
                port: svc.ports.first().copied().unwrap_or(0),
                ttl,
            });
            continue;
        }
        push_per_port(&mut entries, svc.domain(), &svc.host, &svc.ports, ttl);
    }

    if !matched && entries.is_empty() {
        return Err(EngineError::NameNotFound(qname.to_string()));
    }
    Ok(entries)
}

fn push_per_port(entries: &mut Vec<Entry>, owner: String, host: &str, ports: &[u16], ttl: u32) {
    for &port in ports {
        entries.push(Entry {
            owner: owner.clone(),
            host: host.to_string(),
            port,
            ttl,
        });
    }
}

fn entry_ttl(record: &ServiceRecord, default_ttl: u32) -> u32 {
    if record.ttl > 0 { record.ttl } else { default_ttl }
}

/// A/AAAA record for `name` when `host` is an address of the right family.
pub(crate) fn address_record(name: &str, host: &str, ttl: u32) -> Option<Record> {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Some(Record::new(name, ttl, RData::A(ip))),
        Ok(IpAddr::V6(ip)) => Some(Record::new(name, ttl, RData::Aaaa(ip))),
        Err(_) => None,
    }
}

pub(crate) fn a(dir: &dyn Directory, zone: &str, qname: &str, default_ttl: u32) -> Result<Vec<Record>> {
    let entries = match_services(dir, zone, qname, default_ttl)?;
    let mut records = Vec::new();
    for entry in entries {
        match entry.host.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => records.push(Record::new(qname, entry.ttl, RData::A(ip))),
            Ok(IpAddr::V6(_)) => {}
            // external name: answer the alias, the client chases it
            Err(_) => records.push(Record::new(
                qname,
                entry.ttl,
                RData::Cname(dns::fqdn(&entry.host)),
            )),
        }
    }
    Ok(records)
}

pub(crate) fn aaaa(dir: &dyn Directory, zone: &str, qname: &str, default_ttl: u32) -> Result<Vec<Record>> {
    let entries = match_services(dir, zone, qname, default_ttl)?;
    let mut records = Vec::new();
    for entry in entries {
        match entry.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => records.push(Record::new(qname, entry.ttl, RData::Aaaa(ip))),
            Ok(IpAddr::V4(_)) => {}
            Err(_) => records.push(Record::new(
                qname,
                entry.ttl,
                RData::Cname(dns::fqdn(&entry.host)),
            )),
        }
    }
    Ok(records)
}

pub(crate) fn cname(dir: &dyn Directory, zone: &str, qname: &str, default_ttl: u32) -> Result<Vec<Record>> {
    let entries = match_services(dir, zone, qname, default_ttl)?;
    Ok(entries
        .into_iter()
        .filter(|entry| entry.host.parse::<IpAddr>().is_err())
        .map(|entry| Record::new(qname, entry.ttl, RData::Cname(dns::fqdn(&entry.host))))
        .collect())
}

/// The directory carries no TXT data; the lookup only probes existence.
pub(crate) fn txt(dir: &dyn Directory, zone: &str, qname: &str, default_ttl: u32) -> Result<Vec<Record>> {
    match_services(dir, zone, qname, default_ttl)?;
    Ok(Vec::new())
}

/// Likewise for MX: existence probe, never any records.
pub(crate) fn mx(
    dir: &dyn Directory,
    zone: &str,
    qname: &str,
    default_ttl: u32,
) -> Result<(Vec<Record>, Vec<Record>)> {
    match_services(dir, zone, qname, default_ttl)?;
    Ok((Vec::new(), Vec::new()))
}

/// SRV answers point at the entry's own domain, with address glue in the
/// extra section. Weight is split evenly over the entries.
pub(crate) fn srv(
    dir: &dyn Directory,
    zone: &str,
    qname: &str,
    default_ttl: u32,
) -> Result<(Vec<Record>, Vec<Record>)> {
    let entries = match_services(dir, zone, qname, default_ttl)?;
    if entries.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }
    let weight = (100 / entries.len()).max(1) as u16;
    let mut records = Vec::new();
    let mut extra = Vec::new();
    for entry in entries {
        records.push(Record::new(
            qname,
            entry.ttl,
            RData::Srv {
                priority: 0,
                weight,
                port: entry.port,
                target: entry.owner.clone(),
            },
        ));
        if let Some(glue) = address_record(&entry.owner, &entry.host, entry.ttl) {
            extra.push(glue);
        }
    }
    Ok((records, extra))
}

/// Reverse lookup: decode the address from the reverse name and find the
/// service or endpoint carrying it.
pub(crate) fn ptr(dir: &dyn Directory, qname: &str, default_ttl: u32) -> Result<Vec<Record>> {
    let Some(addr) = reverse_address(qname) else {
        return Err(EngineError::NameNotFound(qname.to_string()));
    };
    let wanted = addr.to_string();

    let mut records = Vec::new();
    for svc in dir.list_services() {
        if svc.is_headless() {
            let (Some(name), Some(namespace)) = (svc.service_name(), svc.namespace()) else {
                continue;
            };
            let selector = format!("{name}.{namespace}");
            for ep in dir.list_endpoints(&selector) {
                if ep.host == wanted {
                    records.push(Record::new(
                        qname,
                        entry_ttl(&ep, default_ttl),
                        RData::Ptr(ep.domain()),
                    ));
                }
            }
            continue;
        }
        if svc.host == wanted {
            records.push(Record::new(
                qname,
                entry_ttl(&svc, default_ttl),
                RData::Ptr(svc.domain()),
            ));
        }
    }

    if records.is_empty() {
        return Err(EngineError::NameNotFound(qname.to_string()));
    }
    Ok(records)
}

/// Synthesized apex SOA. The serial tracks the directory's modification
/// counter, so secondaries see every directory change as a zone change.
pub(crate) fn soa(dir: &dyn Directory, zone: &str, min_ttl: u32) -> Record {
    Record::new(
        zone,
        min_ttl,
        RData::Soa {
            mname: format!("ns.dns.{zone}"),
            rname: format!("hostmaster.{zone}"),
            serial: dir.modified_serial(),
            refresh: SOA_REFRESH,
            retry: SOA_RETRY,
            expire: SOA_EXPIRE,
            minimum: min_ttl,
        },
    )
}

/// Synthesized apex NS set. The directory has no glue addresses for the
/// server itself, so the extra section stays empty.
pub(crate) fn ns(zone: &str, ttl: u32) -> (Vec<Record>, Vec<Record>) {
    let records = vec![Record::new(zone, ttl, RData::Ns(format!("ns.dns.{zone}")))];
    (records, Vec::new())
}

/// Decode `4.3.2.1.in-addr.arpa.` / nibble-format `ip6.arpa.` names.
fn reverse_address(qname: &str) -> Option<IpAddr> {
    if let Some(rest) = qname.strip_suffix(".in-addr.arpa.") {
        let mut octets: Vec<u8> = Vec::with_capacity(4);
        for label in rest.split('.') {
            octets.push(label.parse().ok()?);
        }
        if octets.len() != 4 {
            return None;
        }
        octets.reverse();
        return Some(IpAddr::V4(Ipv4Addr::new(
            octets[0], octets[1], octets[2], octets[3],
        )));
    }
    if let Some(rest) = qname.strip_suffix(".ip6.arpa.") {
        let nibbles: Vec<u8> = rest
            .split('.')
            .map(|label| {
                let mut chars = label.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c.to_digit(16).map(|d| d as u8),
                    _ => None,
                }
            })
            .collect::<Option<Vec<u8>>>()?;
        if nibbles.len() != 32 {
            return None;
        }
        let mut octets = [0u8; 16];
        for (i, pair) in nibbles.rchunks(2).enumerate() {
            // labels run least significant nibble first
            octets[i] = (pair[1] << 4) | pair[0];
        }
        return Some(IpAddr::V6(Ipv6Addr::from(octets)));
    }
    None
}
