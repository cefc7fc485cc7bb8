use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Session identity
// ---------------------------------------------------------------------------

/// Integer identifying a logical client session to the gateway.
///
/// The meaning of the value is defined entirely by the remote endpoint;
/// `0` is the conventional interactive session.
pub type ClientId = i32;

// ---------------------------------------------------------------------------
// Server handshake
// ---------------------------------------------------------------------------

/// What the gateway reports about itself during the connection handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Protocol version the server speaks.
    pub version: i32,
    /// Server-formatted connection timestamp (e.g. "20260808 09:30:00 EST").
    /// Opaque to us; reported verbatim.
    pub connection_time: String,
}

// ---------------------------------------------------------------------------
// Error notices
// ---------------------------------------------------------------------------

/// An error notice from the gateway, as handed to registered handlers.
///
/// Mirrors the wire triple: an optional request id the notice relates to
/// (absent for connection-level notices), a numeric code, and a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Request the notice relates to, if any.
    pub req_id: Option<i64>,
    /// Numeric error code (e.g. 502 = couldn't connect).
    pub code: i64,
    pub message: String,
}

impl ErrorEvent {
    /// A connection-level notice (no associated request).
    pub fn connection(code: i64, message: impl Into<String>) -> Self {
        Self {
            req_id: None,
            code,
            message: message.into(),
        }
    }
}
