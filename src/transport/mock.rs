//! Scriptable socket connection for tests.
//!
//! Tests push the frames the "server" should deliver and pick how sends
//! behave; the mock records what the transport wrote and how often it tried
//! to close. Sends and closes share one writer lock, like a real socket's
//! sink half.

use std::io::{Error as IoError, ErrorKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{OwnedMutexGuard, mpsc};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{CloseStatus, FrameKind, ReceiveResult};

use super::socket::{AtomicSocketState, SocketState, WebSocketConnection};

/// What the next `receive_frame` call produces.
pub(crate) enum ScriptedFrame {
    Data {
        bytes: Vec<u8>,
        kind: FrameKind,
        end_of_message: bool,
    },
    Close(CloseStatus),
    Fail(Error),
}

/// How `send_frame` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendBehavior {
    /// Record the payload and succeed.
    Accept,
    /// Record the payload and wait for cancellation.
    Block,
    /// Record the payload and fail with a broken pipe.
    Fail,
}

struct MockInner {
    state: AtomicSocketState,
    writer: Arc<tokio::sync::Mutex<()>>,
    incoming_tx: mpsc::UnboundedSender<ScriptedFrame>,
    incoming_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ScriptedFrame>>,
    sent: Mutex<Vec<(Vec<u8>, FrameKind)>>,
    send_behavior: Mutex<SendBehavior>,
    close_calls: AtomicUsize,
    last_close_status: Mutex<Option<CloseStatus>>,
    fail_close: AtomicBool,
    hang_close: AtomicBool,
    fail_connect: AtomicBool,
    connected_url: Mutex<Option<Url>>,
    released: AtomicBool,
}

/// In-memory [`WebSocketConnection`]. Clones share state.
#[derive(Clone)]
pub(crate) struct MockSocket {
    inner: Arc<MockInner>,
}

impl MockSocket {
    pub(crate) fn new() -> Self {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(MockInner {
                state: AtomicSocketState::new(),
                writer: Arc::new(tokio::sync::Mutex::new(())),
                incoming_tx,
                incoming_rx: tokio::sync::Mutex::new(incoming_rx),
                sent: Mutex::new(Vec::new()),
                send_behavior: Mutex::new(SendBehavior::Accept),
                close_calls: AtomicUsize::new(0),
                last_close_status: Mutex::new(None),
                fail_close: AtomicBool::new(false),
                hang_close: AtomicBool::new(false),
                fail_connect: AtomicBool::new(false),
                connected_url: Mutex::new(None),
                released: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn push(&self, frame: ScriptedFrame) {
        let _ = self.inner.incoming_tx.send(frame);
    }

    pub(crate) fn push_fragment(&self, bytes: &[u8], end_of_message: bool) {
        self.push(ScriptedFrame::Data {
            bytes: bytes.to_vec(),
            kind: FrameKind::Text,
            end_of_message,
        });
    }

    pub(crate) fn push_text(&self, text: &str) {
        self.push_fragment(text.as_bytes(), true);
    }

    pub(crate) fn push_close(&self, status: CloseStatus) {
        self.push(ScriptedFrame::Close(status));
    }

    pub(crate) fn push_error(&self, error: Error) {
        self.push(ScriptedFrame::Fail(error));
    }

    pub(crate) fn set_send_behavior(&self, behavior: SendBehavior) {
        *self.inner.send_behavior.lock() = behavior;
    }

    pub(crate) fn set_state(&self, state: SocketState) {
        self.inner.state.set(state);
    }

    pub(crate) fn fail_close(&self) {
        self.inner.fail_close.store(true, Ordering::SeqCst);
    }

    /// Makes `close` wait forever once it holds the writer.
    pub(crate) fn hang_close(&self) {
        self.inner.hang_close.store(true, Ordering::SeqCst);
    }

    /// Takes the writer lock as a stuck send would.
    pub(crate) async fn hold_writer(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.inner.writer).lock_owned().await
    }

    pub(crate) fn fail_connect(&self) {
        self.inner.fail_connect.store(true, Ordering::SeqCst);
    }

    /// Payloads in the order the transport wrote them.
    pub(crate) fn sent(&self) -> Vec<Vec<u8>> {
        self.inner
            .sent
            .lock()
            .iter()
            .map(|(payload, _)| payload.clone())
            .collect()
    }

    pub(crate) fn sent_kinds(&self) -> Vec<FrameKind> {
        self.inner.sent.lock().iter().map(|(_, kind)| *kind).collect()
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_close_status(&self) -> Option<CloseStatus> {
        *self.inner.last_close_status.lock()
    }

    pub(crate) fn connected_url(&self) -> Option<Url> {
        self.inner.connected_url.lock().clone()
    }

    pub(crate) fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSocketConnection for MockSocket {
    async fn connect(&self, url: &Url, _cancel: &CancellationToken) -> Result<()> {
        self.inner.state.set(SocketState::Connecting);
        if self.inner.fail_connect.load(Ordering::SeqCst) {
            self.inner.state.set(SocketState::Closed);
            return Err(Error::connection("connection refused"));
        }

        *self.inner.connected_url.lock() = Some(url.clone());
        self.inner.state.set(SocketState::Open);
        Ok(())
    }

    async fn receive_frame(
        &self,
        buffer: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<ReceiveResult> {
        let mut incoming = self.inner.incoming_rx.lock().await;
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Canceled),
            frame = incoming.recv() => frame,
        };

        match frame {
            Some(ScriptedFrame::Data {
                bytes,
                kind,
                end_of_message,
            }) => {
                buffer[..bytes.len()].copy_from_slice(&bytes);
                Ok(ReceiveResult::data(bytes.len(), kind, end_of_message))
            }
            Some(ScriptedFrame::Close(status)) => {
                self.inner.state.close_received();
                Ok(ReceiveResult::close(status, None))
            }
            Some(ScriptedFrame::Fail(error)) => Err(error),
            None => Err(Error::ConnectionClosed),
        }
    }

    async fn send_frame(
        &self,
        payload: &[u8],
        kind: FrameKind,
        _end_of_message: bool,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let _writer = self.inner.writer.lock().await;
        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }

        self.inner.sent.lock().push((payload.to_vec(), kind));

        let behavior = *self.inner.send_behavior.lock();
        match behavior {
            SendBehavior::Accept => Ok(()),
            SendBehavior::Block => {
                cancel.cancelled().await;
                Err(Error::Canceled)
            }
            SendBehavior::Fail => Err(Error::Io(IoError::new(
                ErrorKind::BrokenPipe,
                "socket write failed",
            ))),
        }
    }

    async fn close(
        &self,
        status: CloseStatus,
        _reason: Option<&str>,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_close_status.lock() = Some(status);

        let Ok(_writer) = self.inner.writer.try_lock() else {
            return Ok(());
        };

        if self.inner.fail_close.load(Ordering::SeqCst) {
            return Err(Error::connection("close handshake failed"));
        }

        if self.inner.hang_close.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        match self.inner.state.get() {
            SocketState::Idle | SocketState::Connecting => {
                self.inner.state.set(SocketState::Closed);
            }
            _ => {
                self.inner.state.close_sent();
            }
        }
        Ok(())
    }

    fn state(&self) -> SocketState {
        self.inner.state.get()
    }

    async fn release(&self) {
        self.inner.released.store(true, Ordering::SeqCst);
        self.inner.state.set(SocketState::Closed);
    }
}
