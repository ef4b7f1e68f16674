#![allow(dead_code)]

use std::net::SocketAddr;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use svcdns::Request;
use svcdns::directory::{Directory, SERVICE_SEGMENT, ServiceRecord, path};
use svcdns::dns::Message;
use svcdns::dns::enums::ResponseCode;
use svcdns::dns::record::Record;
use svcdns::error::{EngineError, Result};
use svcdns::traits::{Handler, ResponseWriter, TransferTransport};
use svcdns::xfr::Envelope;

pub const ZONE: &str = "cluster.local.";

pub fn client_addr() -> SocketAddr {
    "10.240.0.1:40212".parse().unwrap()
}

pub fn key(tail: &str) -> String {
    format!("{}/{}/{}", path(ZONE), SERVICE_SEGMENT, tail)
}

/// Fixed directory snapshot: a clusterIP service with two ports, a headless
/// service with two endpoints, and an external-name service.
pub struct TestDirectory {
    pub synced: bool,
}

impl TestDirectory {
    pub fn new() -> Self {
        Self { synced: true }
    }
}

impl Directory for TestDirectory {
    fn list_services(&self) -> Vec<ServiceRecord> {
        vec![
            ServiceRecord::new(key("default/web"), "10.1.0.10", vec![80, 443], 0),
            ServiceRecord::new(key("default/hdls"), "", vec![8080], 0),
            ServiceRecord::new(key("default/ext"), "example.net", vec![], 0),
        ]
    }

    fn list_endpoints(&self, selector: &str) -> Vec<ServiceRecord> {
        if selector != "hdls.default" {
            return Vec::new();
        }
        vec![
            ServiceRecord::new(key("default/hdls/ep-0"), "172.16.0.2", vec![8080], 0),
            ServiceRecord::new(key("default/hdls/ep-1"), "172.16.0.3", vec![8080], 0),
        ]
    }

    fn modified_serial(&self) -> u32 {
        2025
    }

    fn has_synced(&self) -> bool {
        self.synced
    }
}

/// Writer that keeps everything written to it and remembers a hijack.
pub struct CaptureWriter {
    pub written: Vec<Message>,
    pub hijacked: bool,
    remote: SocketAddr,
}

impl CaptureWriter {
    pub fn new() -> Self {
        Self {
            written: Vec::new(),
            hijacked: false,
            remote: client_addr(),
        }
    }

    pub fn last(&self) -> &Message {
        self.written.last().expect("nothing was written")
    }
}

#[async_trait]
impl ResponseWriter for CaptureWriter {
    fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    async fn write_msg(&mut self, msg: Message) -> Result<()> {
        self.written.push(msg);
        Ok(())
    }

    fn hijack(&mut self) {
        self.hijacked = true;
    }
}

/// Transfer transport that parks the envelope channel for the test to
/// drain at its own pace.
pub struct StashTransport {
    pub stashed: Mutex<Option<mpsc::Receiver<Envelope>>>,
}

impl StashTransport {
    pub fn new() -> Self {
        Self {
            stashed: Mutex::new(None),
        }
    }

    pub async fn drain(&self) -> Vec<Envelope> {
        let mut rx = self.stashed.lock().take().expect("no transfer was started");
        let mut envelopes = Vec::new();
        while let Some(envelope) = rx.recv().await {
            envelopes.push(envelope);
        }
        envelopes
    }
}

impl TransferTransport for StashTransport {
    fn transfer_out(&self, _reply: Message, envelopes: mpsc::Receiver<Envelope>) {
        *self.stashed.lock() = Some(envelopes);
    }
}

/// Fallback handler double: either answers with a fixed record set or
/// fails, and counts how often it was asked.
pub struct StaticHandler {
    pub answers: Vec<Record>,
    pub fail: bool,
    pub calls: Mutex<usize>,
}

impl StaticHandler {
    pub fn answering(answers: Vec<Record>) -> Self {
        Self {
            answers,
            fail: false,
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            answers: Vec::new(),
            fail: true,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl Handler for StaticHandler {
    async fn serve(
        &self,
        request: &Request,
        writer: &mut dyn ResponseWriter,
    ) -> Result<ResponseCode> {
        *self.calls.lock() += 1;
        if self.fail {
            return Err(EngineError::Transport("next handler unreachable".into()));
        }
        let mut reply = Message::reply_to(&request.msg);
        reply.answers = self.answers.clone();
        writer.write_msg(reply).await?;
        Ok(ResponseCode::NoError)
    }
}
