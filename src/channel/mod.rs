//! Application-facing duplex channel.
//!
//! A duplex channel is a pair of bounded queues. Each end of the pair sees
//! one queue as its `input` (read side) and the other as its `output` (write
//! side):
//!
//! ```text
//! ┌──────────────┐   output ──► SendMessage ──► input    ┌──────────────┐
//! │ Application  │                                       │  Transport   │
//! │    end       │   input  ◄── Vec<u8>     ◄── output   │    end       │
//! └──────────────┘                                       └──────────────┘
//! ```
//!
//! Capacity bounds both queues, so a slow consumer applies backpressure to
//! its producer.
//!
//! # Example
//!
//! ```ignore
//! use ws_transport::channel::duplex;
//!
//! let (transport_end, application_end) = duplex(16)?;
//! let receipt = application_end.send("ping").await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Bounded channel with readiness waits.
pub mod bounded;

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Result, SharedError};
use crate::protocol::{SendMessage, SendReceipt};

// ============================================================================
// Re-exports
// ============================================================================

pub use bounded::Channel;

// ============================================================================
// Types
// ============================================================================

/// The end of a duplex channel held by a transport.
pub type TransportConnection = ChannelConnection<SendMessage, Vec<u8>>;

/// The end of a duplex channel held by the application.
pub type ApplicationConnection = ChannelConnection<Vec<u8>, SendMessage>;

// ============================================================================
// ChannelConnection
// ============================================================================

/// One end of a duplex channel.
#[derive(Debug)]
pub struct ChannelConnection<In, Out> {
    /// Side this end reads from.
    input: Channel<In>,
    /// Side this end writes to.
    output: Channel<Out>,
}

impl<In, Out> Clone for ChannelConnection<In, Out> {
    fn clone(&self) -> Self {
        Self {
            input: self.input.clone(),
            output: self.output.clone(),
        }
    }
}

impl<In, Out> ChannelConnection<In, Out> {
    /// Creates an end from its two sides.
    #[inline]
    #[must_use]
    pub fn new(input: Channel<In>, output: Channel<Out>) -> Self {
        Self { input, output }
    }

    /// Returns the side this end reads from.
    #[inline]
    #[must_use]
    pub fn input(&self) -> &Channel<In> {
        &self.input
    }

    /// Returns the side this end writes to.
    #[inline]
    #[must_use]
    pub fn output(&self) -> &Channel<Out> {
        &self.output
    }
}

/// Creates a duplex channel whose queues hold at most `capacity` items.
///
/// Returns `(transport_end, application_end)`.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidArgument`] if `capacity` is zero.
pub fn duplex(capacity: usize) -> Result<(TransportConnection, ApplicationConnection)> {
    let outbound = Channel::bounded(capacity)?;
    let inbound = Channel::bounded(capacity)?;

    let transport_end = ChannelConnection::new(outbound.clone(), inbound.clone());
    let application_end = ChannelConnection::new(inbound, outbound);

    Ok((transport_end, application_end))
}

// ============================================================================
// ApplicationConnection
// ============================================================================

impl ApplicationConnection {
    /// Queues a payload for the transport, waiting for room if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ChannelClosed`] if the outbound side has been
    /// completed.
    pub async fn send(&self, payload: impl Into<Vec<u8>>) -> Result<SendReceipt> {
        let (message, receipt) = SendMessage::new(payload);
        self.output.write(message).await?;
        Ok(receipt)
    }

    /// Receives the next inbound message.
    ///
    /// Returns `Ok(None)` once the transport ended cleanly.
    ///
    /// # Errors
    ///
    /// Returns the transport's terminal fault once all messages are read.
    pub async fn receive(&self) -> std::result::Result<Option<Vec<u8>>, SharedError> {
        self.input.read().await
    }

    /// Signals that the application will send nothing more.
    ///
    /// The transport's send loop ends once it has drained the queue.
    pub fn complete(&self) -> bool {
        self.output.try_complete(None)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::error::Error;

    #[tokio::test]
    async fn test_duplex_outbound_path() {
        let (transport_end, application_end) = duplex(4).expect("duplex");

        let _receipt = application_end.send("hello").await.expect("send");

        let message = transport_end.input().try_read().expect("queued");
        assert_eq!(message.payload(), b"hello");
    }

    #[tokio::test]
    async fn test_duplex_inbound_path() {
        let (transport_end, application_end) = duplex(4).expect("duplex");

        transport_end
            .output()
            .try_write(b"world".to_vec())
            .expect("room");

        let message = application_end.receive().await.expect("no fault");
        assert_eq!(message, Some(b"world".to_vec()));
    }

    #[tokio::test]
    async fn test_inbound_completion_visible_to_application() {
        let (transport_end, application_end) = duplex(1).expect("duplex");

        transport_end
            .output()
            .try_complete(Some(Arc::new(Error::ConnectionClosed)));

        let err = application_end.receive().await.expect_err("fault");
        assert!(matches!(*err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_send_after_complete_cancels_message() {
        let (_transport_end, application_end) = duplex(1).expect("duplex");
        assert!(application_end.complete());

        let result = application_end.send("late").await;
        assert!(matches!(result, Err(Error::ChannelClosed)));
    }

    #[test]
    fn test_duplex_zero_capacity() {
        assert!(duplex(0).is_err());
    }
}
