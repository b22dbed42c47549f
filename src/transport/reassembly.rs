//! Fragment accumulation for inbound messages.
//!
//! The receive loop reads a message in buffer-sized pieces. Pieces are kept
//! in arrival order until the final fragment arrives, then joined into one
//! contiguous payload.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// FragmentAccumulator
// ============================================================================

/// Segments of the message currently being assembled.
#[derive(Debug, Default)]
pub struct FragmentAccumulator {
    fragments: Vec<Vec<u8>>,
    total: usize,
    limit: Option<usize>,
}

impl FragmentAccumulator {
    /// Creates an accumulator, optionally capping the message size.
    #[inline]
    #[must_use]
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            fragments: Vec::new(),
            total: 0,
            limit,
        }
    }

    /// Appends a fragment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] and clears the accumulator if the
    /// fragment pushes the message past the limit.
    pub fn push(&mut self, fragment: &[u8]) -> Result<()> {
        let size = self.total + fragment.len();
        if let Some(limit) = self.limit
            && size > limit
        {
            self.clear();
            return Err(Error::message_too_large(size, limit));
        }

        self.fragments.push(fragment.to_vec());
        self.total = size;
        Ok(())
    }

    /// Joins the fragments into one payload and resets the accumulator.
    pub fn take(&mut self) -> Vec<u8> {
        let message = if self.fragments.len() == 1 {
            self.fragments.pop().unwrap_or_default()
        } else {
            let mut message = Vec::with_capacity(self.total);
            for fragment in self.fragments.drain(..) {
                message.extend_from_slice(&fragment);
            }
            message
        };

        self.clear();
        message
    }

    /// Discards everything accumulated so far.
    pub fn clear(&mut self) {
        self.fragments.clear();
        self.total = 0;
    }

    /// Returns the number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.total
    }

    /// Returns `true` if no fragment has been pushed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Returns the number of fragments accumulated.
    #[inline]
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
