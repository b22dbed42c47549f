//! Error types for the WebSocket transport.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use ws_transport::{Result, Transport, WebSocketsTransport};
//!
//! async fn example(transport: &WebSocketsTransport) -> Result<()> {
//!     transport.start("http://localhost:5000/chat", connection).await?;
//!     transport.stop().await
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::NotConnected`] |
//! | Protocol | [`Error::InvalidArgument`], [`Error::Protocol`], [`Error::AbnormalClose`], [`Error::MessageTooLarge`] |
//! | Lifecycle | [`Error::Canceled`], [`Error::InvalidState`], [`Error::TaskFailed`] |
//! | Channel | [`Error::ChannelClosed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! # Shared Faults
//!
//! A loop fault is observed by several parties at once (the aggregate
//! completion, the inbound channel, a pending send). Those places carry a
//! [`SharedError`] instead of an owned [`Error`].

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::protocol::CloseStatus;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

/// A fault observed by more than one party.
pub type SharedError = Arc<Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when transport options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the WebSocket handshake cannot be completed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// WebSocket connection closed without a close handshake.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Socket operation attempted before connecting or after release.
    #[error("WebSocket is not connected")]
    NotConnected,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Invalid argument passed to a transport operation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Protocol violation or unexpected frame.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Peer closed the connection with a status other than normal closure.
    #[error("WebSocket closed with error: {status}.")]
    AbnormalClose {
        /// Close status sent by the peer.
        status: CloseStatus,
    },

    /// Reassembled message exceeds the configured limit.
    #[error("Message of {size} bytes exceeds the limit of {limit} bytes")]
    MessageTooLarge {
        /// Bytes accumulated so far.
        size: usize,
        /// Configured maximum message size.
        limit: usize,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Operation canceled by the transport's shutdown signal.
    ///
    /// Benign: loops treat it as a clean exit.
    #[error("Operation canceled")]
    Canceled,

    /// Operation not valid in the transport's current state.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the state violation.
        message: String,
    },

    /// A transport task panicked or was aborted.
    #[error("Transport task failed: {0}")]
    TaskFailed(#[from] JoinError),

    // ========================================================================
    // Channel Errors
    // ========================================================================
    /// The duplex channel side has been completed.
    #[error("Channel closed")]
    ChannelClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an abnormal close error.
    #[inline]
    pub fn abnormal_close(status: CloseStatus) -> Self {
        Self::AbnormalClose { status }
    }

    /// Creates a message too large error.
    #[inline]
    pub fn message_too_large(size: usize, limit: usize) -> Self {
        Self::MessageTooLarge { size, limit }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error came from the shutdown signal.
    #[inline]
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::NotConnected
                | Self::WebSocket(_)
                | Self::Io(_)
        )
    }

    /// Returns `true` if the peer ended the connection abnormally.
    #[inline]
    #[must_use]
    pub fn is_abnormal_close(&self) -> bool {
        matches!(self, Self::AbnormalClose { .. } | Self::ConnectionClosed)
    }
}

// ============================================================================
// Tests
// ============================================================================
