//! Transport configuration.
//!
//! # Example
//!
//! ```ignore
//! use ws_transport::{FrameKind, TransportOptions};
//!
//! let options = TransportOptions::new()
//!     .with_receive_buffer_size(16 * 1024)
//!     .with_max_message_size(1024 * 1024)
//!     .with_message_type(FrameKind::Binary)
//!     .with_header("Authorization", "Bearer token");
//! ```
//!
//! Options can also be loaded from JSON:
//!
//! ```json
//! { "receive_buffer_size": 8192, "max_message_size": null, "message_type": "text", "headers": [], "close_timeout_ms": 5000 }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::FrameKind;

// ============================================================================
// Constants
// ============================================================================

/// Default size of the receive loop's read buffer.
pub const DEFAULT_RECEIVE_BUFFER_SIZE: usize = 4096;

/// Default bound on one close handshake attempt, in milliseconds.
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// TransportOptions
// ============================================================================

/// WebSocket transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    /// Bytes read from the socket per receive call.
    pub receive_buffer_size: usize,

    /// Largest reassembled inbound message accepted, if limited.
    pub max_message_size: Option<usize>,

    /// Frame type used for outbound messages.
    pub message_type: FrameKind,

    /// Extra headers sent with the opening handshake.
    pub headers: Vec<(String, String)>,

    /// Longest a close handshake attempt may block, in milliseconds.
    pub close_timeout_ms: u64,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl TransportOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            max_message_size: None,
            message_type: FrameKind::Text,
            headers: Vec::new(),
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
        }
    }

    /// Returns the close handshake bound.
    #[inline]
    #[must_use]
    pub const fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Parses options from a JSON document.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document is malformed
    /// - [`Error::Config`] if the values are invalid
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl TransportOptions {
    /// Sets the receive buffer size.
    #[inline]
    #[must_use]
    pub fn with_receive_buffer_size(mut self, size: usize) -> Self {
        self.receive_buffer_size = size;
        self
    }

    /// Limits the size of reassembled inbound messages.
    #[inline]
    #[must_use]
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = Some(size);
        self
    }

    /// Sets the outbound frame type.
    #[inline]
    #[must_use]
    pub fn with_message_type(mut self, kind: FrameKind) -> Self {
        self.message_type = kind;
        self
    }

    /// Adds a handshake header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Bounds how long a close handshake attempt may block.
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl TransportOptions {
    /// Checks the options for values the transport cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.receive_buffer_size == 0 {
            return Err(Error::config("receive_buffer_size must be non-zero"));
        }

        if self.max_message_size == Some(0) {
            return Err(Error::config("max_message_size must be non-zero"));
        }

        if !self.message_type.is_data() {
            return Err(Error::config(format!(
                "message_type must be text or binary, got {}",
                self.message_type
            )));
        }

        if self.close_timeout_ms == 0 {
            return Err(Error::config("close_timeout_ms must be non-zero"));
        }

        if let Some((name, _)) = self.headers.iter().find(|(name, _)| name.trim().is_empty()) {
            return Err(Error::config(format!("header name {name:?} is empty")));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TransportOptions::default();
        assert_eq!(options.receive_buffer_size, 4096);
        assert_eq!(options.max_message_size, None);
        assert_eq!(options.message_type, FrameKind::Text);
        assert!(options.headers.is_empty());
        assert_eq!(options.close_timeout(), Duration::from_secs(5));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = TransportOptions::new()
            .with_receive_buffer_size(128)
            .with_max_message_size(1024)
            .with_message_type(FrameKind::Binary)
            .with_header("X-Client", "tests");

        assert_eq!(options.receive_buffer_size, 128);
        assert_eq!(options.max_message_size, Some(1024));
        assert_eq!(options.message_type, FrameKind::Binary);
        assert_eq!(
            options.headers,
            vec![("X-Client".to_string(), "tests".to_string())]
        );
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let options = TransportOptions::new().with_receive_buffer_size(0);
        assert!(matches!(options.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let options = TransportOptions::new().with_max_message_size(0);
        assert!(matches!(options.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_close_message_type() {
        let options = TransportOptions::new().with_message_type(FrameKind::Close);
        assert!(matches!(options.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_close_timeout_round_trips_millis() {
        let options = TransportOptions::new().with_close_timeout(Duration::from_millis(250));
        assert_eq!(options.close_timeout_ms, 250);
        assert_eq!(options.close_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_validate_rejects_zero_close_timeout() {
        let options = TransportOptions::new().with_close_timeout(Duration::ZERO);
        assert!(matches!(options.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_blank_header() {
        let options = TransportOptions::new().with_header(" ", "value");
        assert!(matches!(options.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_from_json_partial() {
        let options =
            TransportOptions::from_json(r#"{ "receive_buffer_size": 512, "message_type": "binary" }"#)
                .expect("valid options");

        assert_eq!(options.receive_buffer_size, 512);
        assert_eq!(options.message_type, FrameKind::Binary);
        assert_eq!(options.max_message_size, None);
    }

    #[test]
    fn test_from_json_invalid_values() {
        let result = TransportOptions::from_json(r#"{ "receive_buffer_size": 0 }"#);
        assert!(matches!(result, Err(Error::Config { .. })));

        let result = TransportOptions::from_json("not json");
        assert!(matches!(result, Err(Error::Json(_))));
    }
}
