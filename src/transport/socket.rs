//! Socket connection contract.
//!
//! [`WebSocketConnection`] is the seam between the transport loops and the
//! WebSocket implementation. The transport shares one connection between
//! its receive loop and its send loop, so every method takes `&self`.
//!
//! # Concurrency
//!
//! Implementations must allow one `receive_frame` to run concurrently with
//! one `send_frame`. Two concurrent receives (or two concurrent sends) need
//! not be supported. `close` may be called from several places at once and
//! must not fault when the connection is already closing or closed.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Result;
use crate::protocol::{CloseStatus, FrameKind, ReceiveResult};

// ============================================================================
// SocketState
// ============================================================================

/// Lifecycle state of a socket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SocketState {
    /// Not connected yet.
    Idle = 0,
    /// Opening handshake in progress.
    Connecting = 1,
    /// Connected; frames flow both ways.
    Open = 2,
    /// Local close frame sent, waiting for the peer's.
    CloseSent = 3,
    /// Peer close frame received, reply not sent yet.
    CloseReceived = 4,
    /// Connection finished.
    Closed = 5,
}

impl SocketState {
    /// Returns `true` while a close handshake is in progress.
    #[inline]
    #[must_use]
    pub const fn is_closing(self) -> bool {
        matches!(self, Self::CloseSent | Self::CloseReceived)
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Open,
            3 => Self::CloseSent,
            4 => Self::CloseReceived,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// AtomicSocketState
// ============================================================================

/// Lock-free cell holding a [`SocketState`].
///
/// Close-handshake transitions are compare-and-swap so that a local close
/// racing with a peer close always ends in [`SocketState::Closed`].
#[derive(Debug)]
pub struct AtomicSocketState(AtomicU8);

impl AtomicSocketState {
    /// Creates a cell in [`SocketState::Idle`].
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(SocketState::Idle as u8))
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn get(&self) -> SocketState {
        SocketState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Overwrites the current state.
    #[inline]
    pub fn set(&self, state: SocketState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Records that a local close frame went out.
    pub fn close_sent(&self) -> SocketState {
        self.transition(|state| match state {
            SocketState::Open => SocketState::CloseSent,
            SocketState::CloseReceived => SocketState::Closed,
            other => other,
        })
    }

    /// Records that the peer's close frame arrived.
    pub fn close_received(&self) -> SocketState {
        self.transition(|state| match state {
            SocketState::Open => SocketState::CloseReceived,
            SocketState::CloseSent => SocketState::Closed,
            other => other,
        })
    }

    fn transition(&self, next: impl Fn(SocketState) -> SocketState) -> SocketState {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let target = next(SocketState::from_u8(current)) as u8;
            match self
                .0
                .compare_exchange(current, target, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return SocketState::from_u8(target),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for AtomicSocketState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// WebSocketConnection
// ============================================================================

/// A full-duplex WebSocket connection.
///
/// Every blocking operation takes a [`CancellationToken`]; when it fires the
/// operation returns [`crate::Error::Canceled`].
#[async_trait]
pub trait WebSocketConnection: Send + Sync + 'static {
    /// Performs the opening handshake against `url` (`ws` or `wss`).
    async fn connect(&self, url: &Url, cancel: &CancellationToken) -> Result<()>;

    /// Reads the next frame chunk into `buffer`.
    async fn receive_frame(
        &self,
        buffer: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<ReceiveResult>;

    /// Writes `payload` as a frame of type `kind`.
    async fn send_frame(
        &self,
        payload: &[u8],
        kind: FrameKind,
        end_of_message: bool,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Starts or completes the close handshake.
    async fn close(
        &self,
        status: CloseStatus,
        reason: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Returns the current connection state.
    fn state(&self) -> SocketState;

    /// Drops the underlying stream.
    async fn release(&self);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip() {
        let cell = AtomicSocketState::new();
        assert_eq!(cell.get(), SocketState::Idle);

        for state in [
            SocketState::Connecting,
            SocketState::Open,
            SocketState::CloseSent,
            SocketState::CloseReceived,
            SocketState::Closed,
        ] {
            cell.set(state);
            assert_eq!(cell.get(), state);
        }
    }

    #[test]
    fn test_local_then_peer_close() {
        let cell = AtomicSocketState::new();
        cell.set(SocketState::Open);

        assert_eq!(cell.close_sent(), SocketState::CloseSent);
        assert!(cell.get().is_closing());
        assert_eq!(cell.close_received(), SocketState::Closed);
    }

    #[test]
    fn test_peer_then_local_close() {
        let cell = AtomicSocketState::new();
        cell.set(SocketState::Open);

        assert_eq!(cell.close_received(), SocketState::CloseReceived);
        assert_eq!(cell.close_sent(), SocketState::Closed);
    }

    #[test]
    fn test_close_transitions_ignore_closed() {
        let cell = AtomicSocketState::new();
        cell.set(SocketState::Closed);

        assert_eq!(cell.close_sent(), SocketState::Closed);
        assert_eq!(cell.close_received(), SocketState::Closed);
        assert!(!SocketState::Closed.is_closing());
    }
}
