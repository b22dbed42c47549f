//! WS Transport - WebSocket transport for duplex message channels.
//!
//! This library connects an application's in-process duplex channel to a
//! WebSocket server and keeps both directions flowing until either side
//! shuts down.
//!
//! # Architecture
//!
//! The transport sits between two endpoints:
//!
//! - **Application**: Writes payloads to the outbound queue, reads whole
//!   messages from the inbound queue
//! - **Server**: Receives one frame per outbound message, sends messages
//!   that may arrive in fragments
//!
//! Key design principles:
//!
//! - Each [`WebSocketsTransport`] owns one socket and two loops
//! - Inbound fragments are reassembled before the application sees them
//! - Bounded queues push backpressure to the producer in both directions
//! - Every queued [`SendMessage`] resolves exactly once
//! - Shutdown is race-tolerant: `stop` may run at any time, any number of
//!   times
//!
//! # Quick Start
//!
//! ```no_run
//! use ws_transport::{Result, Transport, WebSocketsTransport, channel::duplex};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let transport = WebSocketsTransport::new();
//!     let (transport_end, application_end) = duplex(16)?;
//!
//!     // http and https map to ws and wss
//!     transport.start("http://localhost:5000/chat", transport_end).await?;
//!
//!     let receipt = application_end.send("hello").await?;
//!     println!("send: {:?}", receipt.outcome().await.into_result());
//!
//!     if let Ok(Some(reply)) = application_end.receive().await {
//!         println!("reply: {}", String::from_utf8_lossy(&reply));
//!     }
//!
//!     transport.stop().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`channel`] | Bounded duplex channel |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Frame and message types |
//! | [`transport`] | Transport, socket and shutdown |

// ============================================================================
// Modules
// ============================================================================

/// Bounded duplex channel between application and transport.
///
/// Use [`channel::duplex`] to create both ends.
pub mod channel;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Frame and message types.
///
/// - [`FrameKind`] and [`CloseStatus`] - wire-level frame metadata
/// - [`SendMessage`] - outbound payload with its completion
pub mod protocol;

/// WebSocket transport layer.
///
/// The [`Transport`] trait and its WebSocket implementation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Channel types
pub use channel::{ApplicationConnection, Channel, ChannelConnection, TransportConnection};

// Error types
pub use error::{Error, Result, SharedError};

// Protocol types
pub use protocol::{CloseStatus, FrameKind, ReceiveResult, SendMessage, SendOutcome, SendReceipt};

// Transport types
pub use transport::{
    Running, SocketState, Transport, TransportOptions, TungsteniteSocket, WebSocketConnection,
    WebSocketsTransport,
};
