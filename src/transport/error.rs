//! Transport failure taxonomy.
//!
//! Every failed call is classified into exactly one of these variants before
//! it propagates; the cache and mutation layers store and forward the
//! classification without attempting recovery.

/// Classified transport failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// No response reached the client (unreachable server, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The server responded with a non-success HTTP status.
    #[error("request failed with status {status}")]
    Status { status: u16 },

    /// The envelope arrived but carried a non-zero application code.
    #[error("{message} (code {code})")]
    Application { code: i64, message: String },

    /// The response body could not be parsed as an entity envelope.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether this failure happened without any response from the server.
    pub fn is_network(&self) -> bool {
        matches!(self, TransportError::Network(_))
    }

    /// The HTTP status, if this is a status-classified failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status } => Some(*status),
            _ => None,
        }
    }
}
