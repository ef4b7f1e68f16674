//! A response writer that keeps the answer instead of sending it.
//!
//! Used on fallthrough paths where the engine needs to see what the next
//! handler in the chain would have answered - most importantly when merging
//! delegated records into an outgoing zone transfer - without anything
//! reaching the wire.

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::dns::Message;
use crate::error::Result;
use crate::traits::ResponseWriter;

pub struct ResponseBuffer {
    message: Option<Message>,
    remote: SocketAddr,
}

impl ResponseBuffer {
    /// `remote` is echoed from `remote_addr` so the delegated handler sees
    /// the original caller's identity.
    pub fn new(remote: SocketAddr) -> Self {
        Self {
            message: None,
            remote,
        }
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    pub fn take_message(&mut self) -> Option<Message> {
        self.message.take()
    }
}

#[async_trait]
impl ResponseWriter for ResponseBuffer {
    fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// The first write is stored verbatim; every later write only
    /// contributes its answer records, appended in arrival order.
    async fn write_msg(&mut self, msg: Message) -> Result<()> {
        match &mut self.message {
            None => self.message = Some(msg),
            Some(existing) => existing.answers.extend(msg.answers),
        }
        Ok(())
    }

    // hijack, tsig_status and close keep their inert defaults: the buffer
    // has no connection to give up.
}
