//! Read-only view onto the backing service directory.
//!
//! The directory itself (typically a watch-cache over some orchestration
//! API) lives outside this crate. The engine only consumes the narrow
//! snapshot interface below; test doubles implement the same trait.

use std::net::IpAddr;

use crate::dns::enums::RecordType;

/// Path segment under which services are keyed.
pub const SERVICE_SEGMENT: &str = "svc";
/// First segment of every directory key.
pub const KEY_PREFIX: &str = "svcdns";

/// Snapshot interface the engine reads from. Implementations must be safe
/// for concurrent reads; the engine never writes through it.
pub trait Directory: Send + Sync {
    /// Every service entry currently known.
    fn list_services(&self) -> Vec<ServiceRecord>;

    /// Endpoint entries for a `service.namespace` selector. Only meaningful
    /// for headless services.
    fn list_endpoints(&self, selector: &str) -> Vec<ServiceRecord>;

    /// Monotonic counter bumped on every directory change; doubles as the
    /// zone serial.
    fn modified_serial(&self) -> u32;

    /// Whether the initial directory sync has completed. Answers served
    /// before that would be authoritative lies.
    fn has_synced(&self) -> bool;
}

/// One directory entry.
///
/// `key` is a hierarchical path rooted at [`KEY_PREFIX`]:
/// `/svcdns/<zone labels reversed>/svc/<namespace>/<service>[/<endpoint>]`.
/// An empty `host` marks a headless service whose addresses live in its
/// endpoint entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceRecord {
    pub key: String,
    pub host: String,
    pub ports: Vec<u16>,
    pub ttl: u32,
}

impl ServiceRecord {
    pub fn new(key: impl Into<String>, host: impl Into<String>, ports: Vec<u16>, ttl: u32) -> Self {
        Self {
            key: key.into(),
            host: host.into(),
            ports,
            ttl,
        }
    }

    /// Record type this entry's host resolves to: A for IPv4, AAAA for
    /// IPv6, CNAME for anything else.
    pub fn rr_type(&self) -> RecordType {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => RecordType::A,
            Ok(IpAddr::V6(_)) => RecordType::AAAA,
            Err(_) => RecordType::CNAME,
        }
    }

    pub fn is_headless(&self) -> bool {
        self.host.is_empty()
    }

    /// The DNS name this entry answers for.
    pub fn domain(&self) -> String {
        domain(&self.key)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.segment(1)
    }

    pub fn service_name(&self) -> Option<&str> {
        self.segment(2)
    }

    /// Endpoint label, present only on endpoint entries.
    pub fn endpoint(&self) -> Option<&str> {
        self.segment(3)
    }

    fn segment(&self, offset_from_svc: usize) -> Option<&str> {
        let segments: Vec<&str> = self.key.split('/').filter(|s| !s.is_empty()).collect();
        let svc = segments.iter().position(|s| *s == SERVICE_SEGMENT)?;
        segments.get(svc + offset_from_svc).copied()
    }
}

/// Key path for a zone: the zone labels reversed under the key prefix, so
/// `cluster.local.` becomes `/svcdns/local/cluster`.
pub fn path(zone: &str) -> String {
    let mut segments: Vec<&str> = zone
        .trim_end_matches('.')
        .split('.')
        .filter(|s| !s.is_empty())
        .collect();
    segments.reverse();
    format!("/{}/{}", KEY_PREFIX, segments.join("/"))
}

/// Inverse of [`path`] extended over service keys: drops the prefix,
/// reverses the remaining segments and joins them into a fully qualified
/// name. `/svcdns/local/cluster/svc/default/web` becomes
/// `web.default.svc.cluster.local.`.
pub fn domain(key: &str) -> String {
    let mut segments: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).skip(1).collect();
    segments.reverse();
    let mut name = segments.join(".");
    name.push('.');
    name
}
