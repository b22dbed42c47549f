//! Wire-level frame types.
//!
//! Describes what a single socket read produced and how the peer closed
//! the connection. Close status codes follow RFC 6455 Section 7.4.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// FrameKind
// ============================================================================

/// Type tag of a WebSocket frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    /// UTF-8 text payload.
    #[default]
    Text,
    /// Binary payload.
    Binary,
    /// Close frame.
    Close,
}

impl FrameKind {
    /// Returns `true` for text and binary frames.
    #[inline]
    #[must_use]
    pub const fn is_data(self) -> bool {
        matches!(self, Self::Text | Self::Binary)
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "Text",
            Self::Binary => "Binary",
            Self::Close => "Close",
        };
        f.write_str(name)
    }
}

// ============================================================================
// CloseStatus
// ============================================================================

/// Status code carried by a close frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseStatus {
    /// 1000: purpose for the connection has been fulfilled.
    NormalClosure,
    /// 1001: endpoint is going away.
    EndpointUnavailable,
    /// 1002: protocol error.
    ProtocolError,
    /// 1003: unacceptable data type.
    InvalidMessageType,
    /// 1005: close frame carried no status.
    Empty,
    /// 1007: payload inconsistent with the message type.
    InvalidPayloadData,
    /// 1008: policy violation.
    PolicyViolation,
    /// 1009: message too big to process.
    MessageTooBig,
    /// 1010: client expected an extension the server did not negotiate.
    MandatoryExtension,
    /// 1011: unexpected condition on the server.
    InternalServerError,
    /// Any other code.
    Other(u16),
}

impl CloseStatus {
    /// Returns the numeric close code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::NormalClosure => 1000,
            Self::EndpointUnavailable => 1001,
            Self::ProtocolError => 1002,
            Self::InvalidMessageType => 1003,
            Self::Empty => 1005,
            Self::InvalidPayloadData => 1007,
            Self::PolicyViolation => 1008,
            Self::MessageTooBig => 1009,
            Self::MandatoryExtension => 1010,
            Self::InternalServerError => 1011,
            Self::Other(code) => code,
        }
    }

    /// Returns `true` for [`CloseStatus::NormalClosure`].
    #[inline]
    #[must_use]
    pub const fn is_normal(self) -> bool {
        matches!(self, Self::NormalClosure)
    }
}

impl From<u16> for CloseStatus {
    fn from(code: u16) -> Self {
        match code {
            1000 => Self::NormalClosure,
            1001 => Self::EndpointUnavailable,
            1002 => Self::ProtocolError,
            1003 => Self::InvalidMessageType,
            1005 => Self::Empty,
            1007 => Self::InvalidPayloadData,
            1008 => Self::PolicyViolation,
            1009 => Self::MessageTooBig,
            1010 => Self::MandatoryExtension,
            1011 => Self::InternalServerError,
            other => Self::Other(other),
        }
    }
}

impl From<CloseStatus> for u16 {
    #[inline]
    fn from(status: CloseStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for CloseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NormalClosure => f.write_str("NormalClosure"),
            Self::EndpointUnavailable => f.write_str("EndpointUnavailable"),
            Self::ProtocolError => f.write_str("ProtocolError"),
            Self::InvalidMessageType => f.write_str("InvalidMessageType"),
            Self::Empty => f.write_str("Empty"),
            Self::InvalidPayloadData => f.write_str("InvalidPayloadData"),
            Self::PolicyViolation => f.write_str("PolicyViolation"),
            Self::MessageTooBig => f.write_str("MessageTooBig"),
            Self::MandatoryExtension => f.write_str("MandatoryExtension"),
            Self::InternalServerError => f.write_str("InternalServerError"),
            Self::Other(code) => write!(f, "{code}"),
        }
    }
}

// ============================================================================
// ReceiveResult
// ============================================================================

/// Outcome of a single socket read.
///
/// `count` bytes at the start of the caller's buffer are valid. A message
/// ends at the first result with `end_of_message` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveResult {
    /// Number of payload bytes written into the buffer.
    pub count: usize,
    /// Frame type.
    pub kind: FrameKind,
    /// Whether this is the final fragment of the message.
    pub end_of_message: bool,
    /// Close status, set only for close frames.
    pub close_status: Option<CloseStatus>,
    /// Close reason text, set only for close frames.
    pub close_description: Option<String>,
}

impl ReceiveResult {
    /// Creates a result for a data fragment.
    #[inline]
    #[must_use]
    pub fn data(count: usize, kind: FrameKind, end_of_message: bool) -> Self {
        Self {
            count,
            kind,
            end_of_message,
            close_status: None,
            close_description: None,
        }
    }

    /// Creates a result for a close frame.
    #[inline]
    #[must_use]
    pub fn close(status: CloseStatus, description: Option<String>) -> Self {
        Self {
            count: 0,
            kind: FrameKind::Close,
            end_of_message: true,
            close_status: Some(status),
            close_description: description,
        }
    }

    /// Returns `true` if the peer sent a close frame.
    #[inline]
    #[must_use]
    pub fn is_close(&self) -> bool {
        self.kind == FrameKind::Close
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_status_codes() {
        for code in [1000, 1001, 1002, 1003, 1005, 1007, 1008, 1009, 1010, 1011, 4000] {
            assert_eq!(CloseStatus::from(code).code(), code);
        }
        assert_eq!(CloseStatus::from(4000), CloseStatus::Other(4000));
    }

    #[test]
    fn test_close_status_display() {
        assert_eq!(CloseStatus::NormalClosure.to_string(), "NormalClosure");
        assert_eq!(CloseStatus::PolicyViolation.to_string(), "PolicyViolation");
        assert_eq!(CloseStatus::Other(4321).to_string(), "4321");
    }

    #[test]
    fn test_only_normal_closure_is_normal() {
        assert!(CloseStatus::NormalClosure.is_normal());
        assert!(!CloseStatus::EndpointUnavailable.is_normal());
        assert!(!CloseStatus::Empty.is_normal());
    }

    #[test]
    fn test_frame_kind_serde() {
        let json = serde_json::to_string(&FrameKind::Binary).expect("serialize");
        assert_eq!(json, "\"binary\"");

        let kind: FrameKind = serde_json::from_str("\"text\"").expect("deserialize");
        assert_eq!(kind, FrameKind::Text);
        assert!(kind.is_data());
        assert!(!FrameKind::Close.is_data());
    }

    #[test]
    fn test_receive_result_constructors() {
        let data = ReceiveResult::data(12, FrameKind::Binary, false);
        assert!(!data.is_close());
        assert_eq!(data.close_status, None);

        let close = ReceiveResult::close(CloseStatus::NormalClosure, Some("bye".into()));
        assert!(close.is_close());
        assert!(close.end_of_message);
        assert_eq!(close.close_status, Some(CloseStatus::NormalClosure));
    }
}
