//! Authoritative DNS over a dynamic service directory: query dispatch,
//! streamed zone transfers (AXFR) and NOTIFY fan-out to secondaries. The
//! directory, the wire transports and any fallback handler chain are
//! supplied by the host through the traits in [`traits`].

pub mod buffer;
pub mod config;
pub mod directory;
pub mod dns;
pub mod error;
pub mod handler;
mod lookup;
pub mod notify;
pub mod traits;
pub mod xfr;

pub use config::Config;
pub use error::{EngineError, Result};
pub use handler::{Engine, Request};
