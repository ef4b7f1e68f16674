//! Zone change notification to secondary servers (DNS NOTIFY, RFC 1996).
//!
//! Best-effort by design: the broadcast runs on a detached task, walks the
//! destinations sequentially in configured order, and a destination that
//! keeps refusing only costs a log line. Nothing here ever reaches back
//! into the serving path.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::dns::Message;
use crate::dns::enums::ResponseCode;
use crate::error::{EngineError, Result};
use crate::traits::NotifyTransport;

/// Attempts per destination before giving up on it.
const MAX_ATTEMPTS: usize = 3;

/// Placeholder destination meaning "no explicit notify".
const NO_NOTIFY: &str = "*";

/// Send a NOTIFY for `zone` to every destination, detached from the
/// caller. Destinations are tried one after another so total latency is
/// bounded by `destinations x attempts x exchange timeout`.
pub fn broadcast(
    zone: String,
    destinations: Vec<String>,
    transport: Arc<dyn NotifyTransport>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let msg = Message::notify(&zone);
        for destination in &destinations {
            if destination == NO_NOTIFY {
                continue;
            }
            match notify_addr(transport.as_ref(), &msg, &zone, destination).await {
                Ok(()) => info!("sent notify for zone {:?} to {:?}", zone, destination),
                Err(e) => error!("{}", e),
            }
        }
    })
}

/// Try one destination up to [`MAX_ATTEMPTS`] times. A NOERROR reply ends
/// the retries; transport errors and rejection rcodes both burn an attempt.
/// The terminal error names the zone, the destination and the last failure
/// seen, for the log only.
async fn notify_addr(
    transport: &dyn NotifyTransport,
    msg: &Message,
    zone: &str,
    destination: &str,
) -> Result<()> {
    let mut last_failure = String::from("no reply");

    for _ in 0..MAX_ATTEMPTS {
        match transport.exchange(msg, destination).await {
            Ok(reply) if reply.header.rcode == ResponseCode::NoError => return Ok(()),
            Ok(reply) => last_failure = format!("rcode was {}", reply.header.rcode),
            Err(e) => last_failure = e.to_string(),
        }
    }

    Err(EngineError::NotifyRefused {
        zone: zone.to_string(),
        destination: destination.to_string(),
        reason: last_failure,
    })
}
