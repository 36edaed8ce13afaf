//! Error types for client operations.
//!
//! Protocol-level failures (corrupt frames, malformed headers, cell decode
//! mismatches) come from `emberwire_core::Error` and are wrapped unchanged;
//! this module adds only what the transport layer can fail with.
//!
//! ## Error Handling Strategy
//!
//! - **Retriable**: `Transport` (connection errors, timeouts)
//! - **Query errors**: `Server` with the service's own message
//! - **Client bugs**: `Config`
//! - **Fatal for the stream**: `Protocol` (the cursor is unusable after one)

use thiserror::Error;

/// Convenience type alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// All the ways a query can fail end to end.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The byte stream violated the wire protocol.
    ///
    /// Once a cursor reports this the underlying stream offset is lost;
    /// the query must be re-issued, never resumed.
    #[error("protocol error: {0}")]
    Protocol(#[from] emberwire_core::Error),

    /// The HTTP layer failed before or during the response body.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service rejected the query and said why.
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// The client was misconfigured (bad endpoint, missing database, ...).
    #[error("configuration error: {0}")]
    Config(String),
}
