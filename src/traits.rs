//! Interfaces the engine consumes from its host: the response writer it
//! answers into, the next handler in the chain, and the two transports that
//! own wire encoding for zone transfers and NOTIFY exchanges.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::dns::Message;
use crate::dns::enums::ResponseCode;
use crate::error::Result;
use crate::handler::Request;
use crate::xfr::Envelope;

/// Sink a handler writes its response into. Backed by a real connection in
/// production and by [`crate::buffer::ResponseBuffer`] when a delegated
/// answer is captured instead of sent.
#[async_trait]
pub trait ResponseWriter: Send {
    /// Address of the querying client.
    fn remote_addr(&self) -> SocketAddr;

    async fn write_msg(&mut self, msg: Message) -> Result<()>;

    /// Detach the connection from the serving loop; whoever hijacked it
    /// owns all subsequent writes and the close.
    fn hijack(&mut self) {}

    fn tsig_status(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A query handler. The engine implements this itself and consumes it as
/// the fallback seam, so chains compose without the engine knowing what
/// sits behind it.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn serve(
        &self,
        request: &Request,
        writer: &mut dyn ResponseWriter,
    ) -> Result<ResponseCode>;
}

/// Consumer side of a streamed zone transfer. The engine hands over the
/// reply skeleton and the envelope channel; the transport drains the
/// channel on its own task, encodes each envelope as a wire message and
/// owns the connection once the engine has hijacked it. A closed channel
/// is the end-of-stream signal.
pub trait TransferTransport: Send + Sync {
    fn transfer_out(&self, reply: Message, envelopes: mpsc::Receiver<Envelope>);
}

/// Request/response exchange used for NOTIFY. The transport owns encoding,
/// the actual socket work and its own timeout; an expired timeout surfaces
/// as an `Err`.
#[async_trait]
pub trait NotifyTransport: Send + Sync {
    async fn exchange(&self, msg: &Message, destination: &str) -> Result<Message>;
}
