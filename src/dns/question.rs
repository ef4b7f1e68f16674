use super::enums::{Class, RecordType};
use super::name_wire_len;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Question {
    /// Fully qualified, lowercase owner name.
    pub name: String,
    pub qtype: RecordType,
    pub qclass: Class,
}

impl Question {
    pub fn new(name: impl Into<String>, qtype: RecordType) -> Self {
        Self {
            name: super::fqdn(&name.into()),
            qtype,
            qclass: Class::In,
        }
    }

    /// Uncompressed wire size: owner name plus type and class.
    pub fn wire_len(&self) -> usize {
        name_wire_len(&self.name) + 4
    }
}
