use async_trait::async_trait;
use ibtool_core::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::protocol::*;

/// Configuration for connecting to a gateway session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwsConfig {
    /// Host address (e.g. "127.0.0.1").
    pub host: String,
    /// Port the gateway is listening on.
    pub port: u16,
    /// Logical session identifier announced during the handshake.
    pub client_id: ClientId,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for TwsConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7496, // Gateway default for live sessions
            client_id: 0,
            connect_timeout_secs: 5,
        }
    }
}

/// Gateway client session.
///
/// Performs the version/client-id handshake over a TCP socket and exposes
/// error notices to registered handlers via [`ErrorObservable`].
pub struct TwsClient {
    config: TwsConfig,
    stream: Option<TcpStream>,
    connected: bool,
    server: Option<ServerInfo>,
    handlers: Vec<ErrorHandler>,
}

impl TwsClient {
    pub fn new(config: TwsConfig) -> Self {
        Self {
            config,
            stream: None,
            connected: false,
            server: None,
            handlers: Vec::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn client_id(&self) -> ClientId {
        self.config.client_id
    }

    /// Handshake result, once connected.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server.as_ref()
    }

    /// Hand a notice to every registered handler, in registration order.
    fn dispatch(&self, event: &ErrorEvent) {
        warn!(code = event.code, message = %event.message, "Gateway error notice");
        for handler in &self.handlers {
            handler(event);
        }
    }
}

/// Read one NUL-terminated field off the stream.
async fn read_field(stream: &mut TcpStream) -> Result<String, ConnectError> {
    let mut buf = Vec::new();
    loop {
        let byte = stream
            .read_u8()
            .await
            .map_err(|e| ConnectError::Handshake(format!("short read: {}", e)))?;
        if byte == 0 {
            break;
        }
        buf.push(byte);
        if buf.len() > MAX_FIELD_LEN {
            return Err(ConnectError::Handshake(
                "field exceeds maximum length".to_string(),
            ));
        }
    }
    String::from_utf8(buf).map_err(|_| ConnectError::Handshake("non-UTF-8 field".to_string()))
}

#[async_trait]
impl Connectable for TwsClient {
    async fn connect(&mut self) -> Result<ServerInfo, ConnectError> {
        if self.connected {
            return Err(ConnectError::AlreadyConnected);
        }

        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!(%addr, client_id = self.config.client_id, "Connecting to gateway");

        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let mut stream = match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Err(_) => {
                self.dispatch(&ErrorEvent::connection(
                    ERR_CODE_CONNECT_FAIL,
                    format!("Connection to {} timed out", addr),
                ));
                return Err(ConnectError::Timeout(self.config.connect_timeout_secs));
            }
            Ok(Err(e)) => {
                self.dispatch(&ErrorEvent::connection(
                    ERR_CODE_CONNECT_FAIL,
                    format!("Couldn't connect to {}: {}", addr, e),
                ));
                return Err(ConnectError::Refused(e.to_string()));
            }
            Ok(Ok(stream)) => stream,
        };

        // Version handshake: announce ours, read theirs plus the connection
        // time, finish with the client id.
        stream
            .write_all(&encode_field(&CLIENT_VERSION.to_string()))
            .await?;

        let version_field = read_field(&mut stream).await?;
        let version: i32 = version_field.parse().map_err(|_| {
            ConnectError::Handshake(format!("bad server version field '{}'", version_field))
        })?;
        let connection_time = read_field(&mut stream).await?;

        stream
            .write_all(&encode_field(&self.config.client_id.to_string()))
            .await?;

        let server = ServerInfo {
            version,
            connection_time,
        };
        info!(
            server_version = server.version,
            connection_time = %server.connection_time,
            "Gateway handshake complete"
        );

        self.stream = Some(stream);
        self.connected = true;
        self.server = Some(server.clone());
        Ok(server)
    }

    async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            info!("Disconnected from gateway");
        }
        self.connected = false;
        self.server = None;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn error_observer(&mut self) -> Option<&mut dyn ErrorObservable> {
        Some(self)
    }
}

impl ErrorObservable for TwsClient {
    fn register(&mut self, handler: ErrorHandler) {
        self.handlers.push(handler);
    }

    fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    async fn read_wire_field(sock: &mut TcpStream) -> Vec<u8> {
        let mut field = Vec::new();
        loop {
            let byte = sock.read_u8().await.unwrap();
            if byte == 0 {
                return field;
            }
            field.push(byte);
        }
    }

    fn capture_handler(sink: Arc<Mutex<Vec<ErrorEvent>>>) -> ErrorHandler {
        Box::new(move |event| sink.lock().unwrap().push(event.clone()))
    }

    #[tokio::test]
    async fn test_handshake_against_scripted_gateway() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let gateway = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            assert_eq!(read_wire_field(&mut sock).await, b"63");
            sock.write_all(b"76\x0020260808 09:30:00 EST\x00")
                .await
                .unwrap();
            assert_eq!(read_wire_field(&mut sock).await, b"7");
        });

        let mut client = TwsClient::new(TwsConfig {
            host: "127.0.0.1".to_string(),
            port: addr.port(),
            client_id: 7,
            ..Default::default()
        });

        let server = client.connect().await.unwrap();
        assert_eq!(server.version, 76);
        assert_eq!(server.connection_time, "20260808 09:30:00 EST");
        assert!(client.is_connected());
        assert_eq!(client.server_info(), Some(&server));

        match client.connect().await {
            Err(ConnectError::AlreadyConnected) => {}
            other => panic!("Expected AlreadyConnected, got {:?}", other.map(|s| s.version)),
        }

        client.disconnect().await;
        assert!(!client.is_connected());
        assert!(client.server_info().is_none());

        gateway.await.unwrap();
    }

    #[tokio::test]
    async fn test_refused_connect_dispatches_notice() {
        // Grab a free port, then close the listener so nothing answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut client = TwsClient::new(TwsConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..Default::default()
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        client
            .error_observer()
            .unwrap()
            .register(capture_handler(seen.clone()));

        assert!(client.connect().await.is_err());
        assert!(!client.is_connected());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].code, ERR_CODE_CONNECT_FAIL);
        assert!(seen[0].req_id.is_none());
    }

    struct BareSession;

    #[async_trait]
    impl Connectable for BareSession {
        async fn connect(&mut self) -> Result<ServerInfo, ConnectError> {
            Err(ConnectError::Refused("always offline".to_string()))
        }

        async fn disconnect(&mut self) {}

        fn is_connected(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_error_observation_is_optional_capability() {
        let mut bare = BareSession;
        assert!(bare.error_observer().is_none());

        let mut client = TwsClient::new(TwsConfig::default());
        assert!(client.error_observer().is_some());
        client.register(Box::new(|_| {}));
        assert_eq!(client.handler_count(), 1);
    }
}
