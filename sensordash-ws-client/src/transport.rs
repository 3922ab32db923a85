//! Transport seam between the supervisor and the network.
//!
//! The supervisor only ever sees text frames. [`TungsteniteDialer`] is the
//! production implementation; tests substitute an in-memory dialer.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::TransportError;

/// Opens transport sessions.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, url: &str) -> Result<Box<dyn TransportSession>, TransportError>;
}

/// One open connection.
#[async_trait]
pub trait TransportSession: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text frame; `Ok(None)` once the peer closed the connection.
    async fn next_text(&mut self) -> Result<Option<String>, TransportError>;

    /// Best-effort close handshake.
    async fn close(&mut self) {}
}

// ════════════════════════════════════════════════════════════════════
// tokio-tungstenite
// ════════════════════════════════════════════════════════════════════

/// Dials `ws://` / `wss://` endpoints with `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteDialer;

#[async_trait]
impl Dialer for TungsteniteDialer {
    async fn dial(&self, url: &str) -> Result<Box<dyn TransportSession>, TransportError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::connect(url, e))?;
        Ok(Box::new(TungsteniteSession { stream }))
    }
}

struct TungsteniteSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl TransportSession for TungsteniteSession {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| match e {
                WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
                e => TransportError::Send(e.to_string()),
            })
    }

    async fn next_text(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(msg) = self.stream.next().await {
            match msg.map_err(|e| TransportError::Receive(e.to_string()))? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Close(_frame) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("WS client: received close frame {:?}", _frame);
                    return Ok(None);
                }
                // Pings are answered by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {
                    continue
                }
            }
        }
        Ok(None)
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
