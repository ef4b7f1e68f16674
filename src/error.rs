use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// The queried name does not exist in any backing service. Distinguished
    /// from other lookup failures so the dispatcher can answer NXDOMAIN (or
    /// fall through) instead of SERVFAIL.
    #[error("name not found: {0}")]
    NameNotFound(String),

    #[error("directory error: {0}")]
    Directory(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no fallback handler configured")]
    NoFallback,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("notify for zone {zone:?} was not accepted by {destination:?}: {reason}")]
    NotifyRefused {
        zone: String,
        destination: String,
        reason: String,
    },
}

impl EngineError {
    /// True for the distinguished "name does not exist" condition.
    pub fn is_name_error(&self) -> bool {
        matches!(self, Self::NameNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
