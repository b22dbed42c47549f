//! Outbound message and its completion signal.
//!
//! Every [`SendMessage`] resolves exactly once to a [`SendOutcome`]. The
//! application keeps the matching [`SendReceipt`] to learn what happened to
//! its payload.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::{Error, SharedError};

// ============================================================================
// SendOutcome
// ============================================================================

/// Resolution of an outbound message.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// Payload was written to the socket.
    Succeeded,
    /// Shutdown happened before or during the write.
    Canceled,
    /// The write failed.
    Faulted(SharedError),
}

impl SendOutcome {
    /// Returns `true` if the payload reached the socket.
    #[inline]
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns `true` if the send was canceled.
    #[inline]
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Returns `true` if the send faulted.
    #[inline]
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        matches!(self, Self::Faulted(_))
    }

    /// Converts the outcome into a result.
    ///
    /// # Errors
    ///
    /// - [`Error::Canceled`] for a canceled send
    /// - the causing error for a faulted send
    pub fn into_result(self) -> Result<(), SharedError> {
        match self {
            Self::Succeeded => Ok(()),
            Self::Canceled => Err(Arc::new(Error::Canceled)),
            Self::Faulted(err) => Err(err),
        }
    }
}

// ============================================================================
// SendMessage
// ============================================================================

/// A payload queued by the application for the socket.
///
/// Dropping a message that was never resolved resolves it as
/// [`SendOutcome::Canceled`].
#[derive(Debug)]
pub struct SendMessage {
    /// Immutable payload.
    payload: Vec<u8>,
    /// Completion signal, taken on resolution.
    completion: Option<oneshot::Sender<SendOutcome>>,
}

impl SendMessage {
    /// Creates a message and the receipt that observes its outcome.
    #[must_use]
    pub fn new(payload: impl Into<Vec<u8>>) -> (Self, SendReceipt) {
        let (tx, rx) = oneshot::channel();
        let message = Self {
            payload: payload.into(),
            completion: Some(tx),
        };
        (message, SendReceipt { rx })
    }

    /// Returns the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Resolves the message.
    ///
    /// Returns `false` if the receipt was already dropped.
    pub fn resolve(mut self, outcome: SendOutcome) -> bool {
        match self.completion.take() {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }
}

impl Drop for SendMessage {
    fn drop(&mut self) {
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(SendOutcome::Canceled);
        }
    }
}

// ============================================================================
// SendReceipt
// ============================================================================

/// Application-side handle to a message's outcome.
#[derive(Debug)]
pub struct SendReceipt {
    rx: oneshot::Receiver<SendOutcome>,
}

impl SendReceipt {
    /// Waits for the message to resolve.
    pub async fn outcome(self) -> SendOutcome {
        // The sender always resolves before it is dropped.
        self.rx.await.unwrap_or(SendOutcome::Canceled)
    }

    /// Returns the outcome if the message has already resolved.
    pub fn try_outcome(&mut self) -> Option<SendOutcome> {
        self.rx.try_recv().ok()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_succeeded() {
        let (message, receipt) = SendMessage::new("hello");
        assert_eq!(message.payload(), b"hello");
        assert_eq!(message.len(), 5);

        assert!(message.resolve(SendOutcome::Succeeded));
        assert!(receipt.outcome().await.is_succeeded());
    }

    #[tokio::test]
    async fn test_drop_resolves_canceled() {
        let (message, receipt) = SendMessage::new(vec![1, 2, 3]);
        drop(message);

        assert!(receipt.outcome().await.is_canceled());
    }

    #[tokio::test]
    async fn test_faulted_carries_error() {
        let (message, receipt) = SendMessage::new("x");
        let err = Arc::new(Error::ConnectionClosed);
        message.resolve(SendOutcome::Faulted(Arc::clone(&err)));

        let outcome = receipt.outcome().await;
        assert!(outcome.is_faulted());
        let err = outcome.into_result().unwrap_err();
        assert!(matches!(*err, Error::ConnectionClosed));
    }

    #[test]
    fn test_try_outcome_pending() {
        let (message, mut receipt) = SendMessage::new("");
        assert!(message.is_empty());
        assert!(receipt.try_outcome().is_none());

        message.resolve(SendOutcome::Canceled);
        assert!(matches!(receipt.try_outcome(), Some(SendOutcome::Canceled)));
    }

    #[test]
    fn test_resolve_after_receipt_dropped() {
        let (message, receipt) = SendMessage::new("late");
        drop(receipt);
        assert!(!message.resolve(SendOutcome::Succeeded));
    }

    #[test]
    fn test_canceled_into_result() {
        let err = SendOutcome::Canceled.into_result().unwrap_err();
        assert!(err.is_canceled());
    }
}
