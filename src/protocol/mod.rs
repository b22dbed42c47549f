//! Frame and message types shared by the transport and the application.
//!
//! # Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `SendMessage` | Application → Socket | Outbound payload with completion |
//! | `ReceiveResult` | Socket → Transport | One frame read from the socket |
//! | `CloseStatus` | Socket → Transport | Why the peer closed |
//!
//! Inbound messages are plain `Vec<u8>` once reassembled.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Frame kinds, close status, receive results |
//! | `message` | Outbound message, outcome and receipt |

// ============================================================================
// Submodules
// ============================================================================

/// Wire-level frame types.
pub mod frame;

/// Outbound message types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{CloseStatus, FrameKind, ReceiveResult};
pub use message::{SendMessage, SendOutcome, SendReceipt};
