use serde::Deserialize;

use crate::dns;
use crate::error::{EngineError, Result};

/// Lowest TTL the engine will serve.
pub const MIN_TTL: u32 = 5;
/// Highest TTL the engine will serve.
pub const MAX_TTL: u32 = 3600;
/// Default byte threshold at which a zone transfer starts a new envelope.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Resolved engine configuration. Whatever directive syntax the host parses
/// is its own business; the engine consumes this struct, validated once at
/// construction and immutable afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Zones the engine is authoritative for, in configuration order. The
    /// first non-reverse zone is the primary.
    pub zones: Vec<String>,

    /// Forward unmatched names and NXDOMAIN results to the next handler
    /// instead of answering negatively.
    pub fallthrough: bool,

    /// Secondary servers to NOTIFY on zone change. A `*` entry means "no
    /// explicit notify" and is skipped during fan-out.
    pub transfer_to: Vec<String>,

    /// Byte threshold for cutting zone transfer envelopes.
    pub chunk_size: usize,

    /// TTL applied to records whose directory entry carries none.
    pub ttl: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zones: Vec::new(),
            fallthrough: false,
            transfer_to: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            ttl: MIN_TTL,
        }
    }
}

impl Config {
    /// Normalize zone names and reject values the engine cannot serve.
    pub fn validate(&mut self) -> Result<()> {
        if self.zones.is_empty() {
            return Err(EngineError::Config("no zones configured".to_string()));
        }
        for zone in &mut self.zones {
            *zone = dns::fqdn(zone);
        }
        if self.chunk_size == 0 {
            return Err(EngineError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if !(MIN_TTL..=MAX_TTL).contains(&self.ttl) {
            return Err(EngineError::Config(format!(
                "ttl must be in range [{MIN_TTL}, {MAX_TTL}], got {}",
                self.ttl
            )));
        }
        Ok(())
    }

    /// Index of the primary zone: the first configured zone that is not a
    /// reverse zone. None when only reverse zones are configured.
    pub fn primary_zone_index(&self) -> Option<usize> {
        self.zones.iter().position(|z| !dns::is_reverse_zone(z))
    }
}
