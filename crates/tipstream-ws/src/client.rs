//! WebSocket push connector.
//!
//! A [`WsSession`] is a thin text-frame pipe over one tungstenite stream.
//! Pings are answered inline and a close frame ends the session.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use tipstream_core::error::TransportError;
use tipstream_core::transport::{PushConnector, PushSession};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for [`WsConnector`].
#[derive(Debug, Clone)]
pub struct WsConnectorConfig {
    /// Upper bound on TCP + TLS + upgrade handshake.
    pub connect_timeout: Duration,
}

impl Default for WsConnectorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Opens [`WsSession`]s with `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    config: WsConnectorConfig,
}

impl WsConnector {
    pub fn new(config: WsConnectorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PushConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn PushSession>, TransportError> {
        tracing::info!(url = %url, "connecting via WebSocket");

        let timeout = self.config.connect_timeout;
        let (stream, _) = time::timeout(timeout, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| TransportError::Timeout {
                ms: timeout.as_millis() as u64,
            })?
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;

        Ok(Box::new(WsSession { stream }))
    }
}

/// One open WebSocket connection.
pub struct WsSession {
    stream: WsStream,
}

#[async_trait]
impl PushSession for WsSession {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))
    }

    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Err(e) => return Some(Err(TransportError::WebSocket(e.to_string()))),
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => tracing::debug!(len = bytes.len(), "ignoring non-UTF-8 binary frame"),
                },
                Ok(Message::Ping(payload)) => {
                    if let Err(e) = self.stream.send(Message::Pong(payload)).await {
                        return Some(Err(TransportError::WebSocket(e.to_string())));
                    }
                }
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "WS closed by peer");
                    return None;
                }
                Ok(_) => {}
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "WS close failed");
        }
    }
}
