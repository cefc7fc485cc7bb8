use crate::models::*;
use serde::{Deserialize, Serialize};

/// Connection lifecycle events observable by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientEvent {
    /// Handshake completed; the server introduced itself.
    Connected(ServerInfo),
    /// The session was closed, by either side.
    Disconnected,
    /// The gateway sent an error notice.
    Error(ErrorEvent),
}
