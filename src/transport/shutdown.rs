//! Shared shutdown signal and best-effort close.
//!
//! Both transport loops and `stop()` hold a [`ShutdownCoordinator`]. Either
//! loop triggers it on exit so the other winds down, and any of them may
//! ask for the socket to be closed. Close attempts can race each other; the
//! losers are logged and ignored. Each attempt is bounded by a timeout so a
//! peer that stopped reading cannot hold up shutdown.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::protocol::CloseStatus;

use super::socket::{SocketState, WebSocketConnection};

// ============================================================================
// ShutdownCoordinator
// ============================================================================

/// Cancellation signal plus close handshake for one transport.
pub struct ShutdownCoordinator<S> {
    socket: Arc<S>,
    token: CancellationToken,
    /// Bound on one close attempt.
    close_timeout: Duration,
}

impl<S> Clone for ShutdownCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            socket: Arc::clone(&self.socket),
            token: self.token.clone(),
            close_timeout: self.close_timeout,
        }
    }
}

impl<S: WebSocketConnection> ShutdownCoordinator<S> {
    /// Creates a coordinator for `socket` with an unset signal.
    #[must_use]
    pub fn new(socket: Arc<S>, close_timeout: Duration) -> Self {
        Self {
            socket,
            token: CancellationToken::new(),
            close_timeout,
        }
    }

    /// Returns the shared cancellation token.
    #[inline]
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Sets the shutdown signal. Setting it again has no effect.
    #[inline]
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the signal is set.
    #[inline]
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Closes the socket with [`CloseStatus::NormalClosure`] unless it is
    /// already closed.
    ///
    /// Never fails: a close error most likely means another caller closed
    /// the socket first. Gives up after the close timeout.
    pub async fn request_close(&self) {
        if self.socket.state() == SocketState::Closed {
            debug!("WebSocket already closed");
            return;
        }

        info!("Closing WebSocket");

        // The close handshake must not be cut short by the shutdown signal.
        let never = CancellationToken::new();
        let close = self.socket.close(CloseStatus::NormalClosure, None, &never);
        match timeout(self.close_timeout, close).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Closing WebSocket failed"),
            Err(_) => warn!(
                timeout_ms = self.close_timeout.as_millis() as u64,
                "Closing WebSocket timed out"
            ),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
