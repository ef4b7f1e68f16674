use super::enums::{Opcode, ResponseCode};

/// Message header flags. Section counts are not stored; they are derived
/// from the section vectors when the transport encodes the message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub response: bool,
    pub opcode: Opcode,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub rcode: ResponseCode,
}

impl Header {
    /// Fixed wire size of a DNS header.
    pub const WIRE_LEN: usize = 12;
}
