// src/realtime/socket.rs - Socket seam and its tokio-tungstenite implementation
//
// Subscription drivers talk to a `Socket` obtained from a `Connector`, so the
// reconnect and queueing logic can be driven by scripted sockets in tests.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::borrow::Cow;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::infra::errors::DojoError;

/// Normal closure.
pub const NORMAL_CLOSE: u16 = 1000;
/// Close frame without a status code.
pub const NO_STATUS_CLOSE: u16 = 1005;
/// Connection dropped without a close frame.
pub const ABNORMAL_CLOSE: u16 = 1006;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close { code: u16, reason: String },
}

#[async_trait]
pub trait Socket: Send {
    async fn send(&mut self, text: String) -> Result<(), DojoError>;

    /// Next application frame. `None` once the connection is gone without a
    /// close frame. Must be cancel-safe.
    async fn recv(&mut self) -> Option<Frame>;

    async fn close(&mut self, code: u16, reason: &str);
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Socket>, DojoError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Socket>, DojoError> {
        let (stream, _response) =
            tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| DojoError::WebSocket {
                    scope: url.to_string(),
                    message: e.to_string(),
                })?;
        tracing::debug!("WebSocket handshake complete: {}", url);
        Ok(Box::new(TungsteniteSocket {
            url: url.to_string(),
            stream,
        }))
    }
}

struct TungsteniteSocket {
    url: String,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Socket for TungsteniteSocket {
    async fn send(&mut self, text: String) -> Result<(), DojoError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| DojoError::WebSocket {
                scope: self.url.clone(),
                message: e.to_string(),
            })
    }

    async fn recv(&mut self) -> Option<Frame> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Frame::Text(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Frame::Text(text)),
                    Err(_) => tracing::debug!("Dropping non-UTF-8 binary frame from {}", self.url),
                },
                Ok(Message::Close(frame)) => {
                    return Some(match frame {
                        Some(f) => Frame::Close {
                            code: u16::from(f.code),
                            reason: f.reason.into_owned(),
                        },
                        None => Frame::Close {
                            code: NO_STATUS_CLOSE,
                            reason: String::new(),
                        },
                    })
                }
                // Pongs are queued by tungstenite itself.
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("WebSocket read error on {}: {}", self.url, e);
                    return None;
                }
            }
        }
    }

    async fn close(&mut self, code: u16, reason: &str) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: Cow::Owned(reason.to_string()),
        };
        if let Err(e) = self.stream.close(Some(frame)).await {
            tracing::debug!("WebSocket close on {} failed: {}", self.url, e);
        }
    }
}
