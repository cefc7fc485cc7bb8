use crate::models::*;
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Connection Traits
// ---------------------------------------------------------------------------

/// Errors that can occur while establishing or tearing down a session.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Connection refused: {0}")]
    Refused(String),
    #[error("Handshake failed: {0}")]
    Handshake(String),
    #[error("Connection timed out after {0}s")]
    Timeout(u64),
    #[error("Already connected")]
    AlreadyConnected,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Callback invoked for every error notice the connection receives.
pub type ErrorHandler = Box<dyn Fn(&ErrorEvent) + Send + Sync>;

/// Optional capability: a connection that lets callers observe error
/// notices. Query it through [`Connectable::error_observer`] instead of
/// probing concrete types.
pub trait ErrorObservable {
    /// Register a handler. Handlers run in registration order for every
    /// notice dispatched after registration; there is no deregistration.
    fn register(&mut self, handler: ErrorHandler);

    /// Number of handlers currently registered.
    fn handler_count(&self) -> usize;
}

/// A client session to a gateway endpoint.
#[async_trait]
pub trait Connectable {
    /// Establish the session and perform the version handshake.
    ///
    /// Fails with [`ConnectError::AlreadyConnected`] if a session is
    /// already up.
    async fn connect(&mut self) -> Result<ServerInfo, ConnectError>;

    /// Tear down the session. A no-op when not connected.
    async fn disconnect(&mut self);

    /// Whether a session is currently established.
    fn is_connected(&self) -> bool;

    /// The error-observation capability, if this implementation has one.
    fn error_observer(&mut self) -> Option<&mut dyn ErrorObservable> {
        None
    }
}

// ---------------------------------------------------------------------------
// Source Transformation Trait
// ---------------------------------------------------------------------------

/// Errors raised by a source-transformation engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransformError {
    #[error("Parse error in {label}: {detail}")]
    Parse { label: String, detail: String },
    #[error("Fixer '{fixer}' failed: {detail}")]
    Fixer {
        fixer: &'static str,
        detail: String,
    },
}

/// A batch source-transformation engine: rewrites one unit of source text.
///
/// `label` is a diagnostic name for the unit (typically its file path) and
/// must not affect the rewrite. Implementations are stateless per call.
pub trait SourceTransform {
    fn transform(&self, source: &str, label: &str) -> Result<String, TransformError>;
}
