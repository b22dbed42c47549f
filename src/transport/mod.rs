//! WebSocket transport layer.
//!
//! This module moves messages between an application's duplex channel and a
//! WebSocket connection.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   SendMessage   ┌──────────────────┐    frames    ┌──────────┐
//! │                 │ ──────────────► │  send loop       │ ───────────► │          │
//! │  Application    │                 │                  │              │  Server  │
//! │  (duplex end)   │ ◄────────────── │  receive loop    │ ◄─────────── │          │
//! └─────────────────┘     Vec<u8>     └──────────────────┘   fragments  └──────────┘
//! ```
//!
//! # Lifecycle
//!
//! 1. `Transport::start` - Resolve the URL, connect, launch both loops
//! 2. Loops run until the server closes, a fault occurs or the shutdown
//!    signal fires
//! 3. `Transport::running` - Resolves once both loops have ended
//! 4. `Transport::stop` - Close, signal, wait for the loops, release
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websockets` | The transport and its two loops |
//! | `socket` | Socket trait and connection state |
//! | `tungstenite_socket` | Socket over `tokio-tungstenite` |
//! | `shutdown` | Shared shutdown signal and close |
//! | `reassembly` | Fragment accumulation |
//! | `options` | Transport configuration |
//! | `endpoint` | URL scheme mapping |

// ============================================================================
// Submodules
// ============================================================================

/// URL resolution.
pub mod endpoint;

/// Transport configuration.
pub mod options;

/// Fragment reassembly.
pub mod reassembly;

/// Shutdown coordination.
pub mod shutdown;

/// Socket abstraction.
pub mod socket;

/// `tokio-tungstenite` socket.
pub mod tungstenite_socket;

/// WebSocket transport.
pub mod websockets;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::future::{BoxFuture, Shared};

use crate::channel::TransportConnection;
use crate::error::{Result, SharedError};

// ============================================================================
// Re-exports
// ============================================================================

pub use endpoint::resolve_url;
pub use options::{DEFAULT_RECEIVE_BUFFER_SIZE, TransportOptions};
pub use reassembly::FragmentAccumulator;
pub use shutdown::ShutdownCoordinator;
pub use socket::{AtomicSocketState, SocketState, WebSocketConnection};
pub use tungstenite_socket::TungsteniteSocket;
pub use websockets::WebSocketsTransport;

// ============================================================================
// Types
// ============================================================================

/// Completion of a transport's loops.
///
/// Resolves `Ok(())` when both loops ended cleanly, or with the fault that
/// ended them. Clones observe the same outcome.
pub type Running = Shared<BoxFuture<'static, std::result::Result<(), SharedError>>>;

// ============================================================================
// Transport
// ============================================================================

/// A transport carrying a duplex channel's messages to a server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connects to `url` and starts moving messages for `application`.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidArgument`] if `url` is blank or unparsable
    /// - [`crate::Error::InvalidState`] if the transport was already started
    ///   or stopped
    /// - Any connection error; no loops are launched in that case
    async fn start(&self, url: &str, application: TransportConnection) -> Result<()>;

    /// Closes the connection and waits for both loops to end.
    ///
    /// Safe to call repeatedly and concurrently. Loop faults are not
    /// returned here; the application sees them on the inbound side.
    async fn stop(&self) -> Result<()>;

    /// Returns the aggregate completion of both loops.
    fn running(&self) -> Running;
}
