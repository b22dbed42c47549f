//! WebSocket connection backed by `tokio-tungstenite`.
//!
//! The stream is split after the handshake so the receive loop and the send
//! loop each lock only their own half.
//!
//! tungstenite hands out whole messages. [`TungsteniteSocket::receive_frame`]
//! copies a message into the caller's buffer chunk by chunk and marks the
//! last chunk with `end_of_message`.
//!
//! `close` never waits for the write half. If a send holds it, that send is
//! stuck on the peer and the close frame is skipped.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{CloseStatus, FrameKind, ReceiveResult};

use super::socket::{AtomicSocketState, SocketState, WebSocketConnection};

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A received message not yet fully copied out.
struct Pending {
    data: Vec<u8>,
    offset: usize,
    kind: FrameKind,
}

/// Read half plus the message being handed out.
#[derive(Default)]
struct ReadHalf {
    stream: Option<SplitStream<WsStream>>,
    pending: Option<Pending>,
}

// ============================================================================
// TungsteniteSocket
// ============================================================================

/// Client WebSocket connection over TCP.
///
/// `wss` URLs need a TLS feature enabled on `tokio-tungstenite`.
pub struct TungsteniteSocket {
    /// Extra handshake headers.
    headers: Vec<(String, String)>,
    state: AtomicSocketState,
    writer: Mutex<Option<SplitSink<WsStream, Message>>>,
    reader: Mutex<ReadHalf>,
}

impl TungsteniteSocket {
    /// Creates an unconnected socket.
    #[must_use]
    pub fn new(headers: Vec<(String, String)>) -> Self {
        Self {
            headers,
            state: AtomicSocketState::new(),
            writer: Mutex::new(None),
            reader: Mutex::new(ReadHalf::default()),
        }
    }

    async fn open(&self, url: &Url, cancel: &CancellationToken) -> Result<()> {
        let mut request = url.as_str().into_client_request()?;
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::invalid_argument(format!("header name {name:?}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| Error::invalid_argument(format!("header {name:?} value: {e}")))?;
            request.headers_mut().append(header_name, header_value);
        }

        let (ws_stream, response) = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Canceled),
            result = tokio_tungstenite::connect_async(request) => result
                .map_err(|e| Error::connection(format!("WebSocket handshake failed: {e}")))?,
        };

        debug!(status = %response.status(), %url, "WebSocket handshake completed");

        let (sink, stream) = ws_stream.split();
        *self.writer.lock().await = Some(sink);
        *self.reader.lock().await = ReadHalf {
            stream: Some(stream),
            pending: None,
        };

        Ok(())
    }
}

impl Default for TungsteniteSocket {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

// ============================================================================
// WebSocketConnection
// ============================================================================

#[async_trait]
impl WebSocketConnection for TungsteniteSocket {
    async fn connect(&self, url: &Url, cancel: &CancellationToken) -> Result<()> {
        self.state.set(SocketState::Connecting);

        match self.open(url, cancel).await {
            Ok(()) => {
                self.state.set(SocketState::Open);
                Ok(())
            }
            Err(e) => {
                self.state.set(SocketState::Closed);
                Err(e)
            }
        }
    }

    async fn receive_frame(
        &self,
        buffer: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<ReceiveResult> {
        let mut guard = self.reader.lock().await;
        let reader = &mut *guard;

        if reader.pending.is_none() {
            let stream = reader.stream.as_mut().ok_or(Error::NotConnected)?;

            let (data, kind) = loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(Error::Canceled),
                    next = stream.next() => next,
                };

                match next {
                    Some(Ok(Message::Text(text))) => break (text.as_bytes().to_vec(), FrameKind::Text),
                    Some(Ok(Message::Binary(bytes))) => break (bytes.to_vec(), FrameKind::Binary),
                    Some(Ok(Message::Close(frame))) => {
                        self.state.close_received();
                        let (status, description) = match frame {
                            Some(frame) => (
                                CloseStatus::from(u16::from(frame.code)),
                                Some(frame.reason.as_str().to_owned()),
                            ),
                            None => (CloseStatus::Empty, None),
                        };
                        return Ok(ReceiveResult::close(status, description));
                    }
                    // Ping and pong are answered by tungstenite itself.
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        self.state.set(SocketState::Closed);
                        return Err(e.into());
                    }
                    None => {
                        self.state.set(SocketState::Closed);
                        return Err(Error::ConnectionClosed);
                    }
                }
            };

            trace!(size = data.len(), %kind, "WebSocket message read");
            reader.pending = Some(Pending {
                data,
                offset: 0,
                kind,
            });
        }

        let Some(pending) = reader.pending.as_mut() else {
            return Err(Error::protocol("no message pending"));
        };

        let remaining = &pending.data[pending.offset..];
        let count = remaining.len().min(buffer.len());
        buffer[..count].copy_from_slice(&remaining[..count]);
        pending.offset += count;

        let kind = pending.kind;
        let end_of_message = pending.offset == pending.data.len();
        if end_of_message {
            reader.pending = None;
        }

        Ok(ReceiveResult::data(count, kind, end_of_message))
    }

    async fn send_frame(
        &self,
        payload: &[u8],
        kind: FrameKind,
        end_of_message: bool,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if !end_of_message {
            return Err(Error::invalid_argument(
                "partial frames are not supported, send whole messages",
            ));
        }

        let message = match kind {
            FrameKind::Text => {
                let text = std::str::from_utf8(payload).map_err(|e| {
                    Error::invalid_argument(format!("text payload is not UTF-8: {e}"))
                })?;
                Message::Text(text.to_owned().into())
            }
            FrameKind::Binary => Message::Binary(payload.to_vec().into()),
            FrameKind::Close => {
                return Err(Error::invalid_argument("use close() to send a close frame"));
            }
        };

        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(Error::NotConnected)?;

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Canceled),
            result = sink.send(message) => result.map_err(Error::from),
        }
    }

    async fn close(
        &self,
        status: CloseStatus,
        reason: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let Ok(mut writer) = self.writer.try_lock() else {
            debug!("WebSocket writer busy, skipping close frame");
            return Ok(());
        };

        match self.state.get() {
            SocketState::CloseSent | SocketState::Closed => return Ok(()),
            SocketState::Idle | SocketState::Connecting => {
                self.state.set(SocketState::Closed);
                return Ok(());
            }
            SocketState::Open | SocketState::CloseReceived => {}
        }

        let sink = writer.as_mut().ok_or(Error::NotConnected)?;

        if self.state.get() == SocketState::CloseReceived {
            // tungstenite queued the reply when the peer's close arrived.
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Canceled),
                result = sink.flush() => result?,
            }
            self.state.set(SocketState::Closed);
            return Ok(());
        }

        let frame = CloseFrame {
            code: CloseCode::from(status.code()),
            reason: reason.unwrap_or_default().to_owned().into(),
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Canceled),
            result = sink.send(Message::Close(Some(frame))) => result?,
        }

        let state = self.state.close_sent();
        debug!(%status, %state, "WebSocket close frame sent");
        Ok(())
    }

    fn state(&self) -> SocketState {
        self.state.get()
    }

    async fn release(&self) {
        self.writer.lock().await.take();
        *self.reader.lock().await = ReadHalf::default();
        self.state.set(SocketState::Closed);
    }
}

// ============================================================================
// Tests
// ============================================================================
