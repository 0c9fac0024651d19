//! Error types for the owserver protocol.

use std::io;
use thiserror::Error;

/// Result type alias for owserver operations.
pub type Result<T> = std::result::Result<T, OwError>;

/// Errors that can occur while talking to an owserver.
#[derive(Debug, Error)]
pub enum OwError {
    /// A header buffer was not exactly 24 bytes long.
    #[error("Malformed frame: expected 24 header bytes, got {len}")]
    MalformedFrame {
        /// Length of the rejected buffer.
        len: usize,
    },

    /// The server closed the stream before a full header or payload arrived.
    #[error("Short read: expected {expected} bytes, received {received}")]
    ShortRead {
        /// Number of bytes the framing required.
        expected: usize,
        /// Number of bytes actually received.
        received: usize,
    },

    /// Socket connect/send/receive failure.
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// A presence or type read returned no value.
    #[error("Unknown sensor: {path}")]
    UnknownSensor {
        /// Path that was read.
        path: String,
    },

    /// The attribute is not part of the node's attribute index.
    #[error("Unknown attribute: {name}")]
    UnknownAttribute {
        /// Requested attribute name.
        name: String,
    },

    /// No connection parameters were supplied and no defaults are set.
    #[error("Connection defaults not initialized")]
    NotInitialized,

    /// The interface initialization string could not be parsed.
    #[error("No controller for interface '{interface}'")]
    NoController {
        /// The rejected interface string.
        interface: String,
    },

    /// A request could not be framed.
    #[error("Invalid request: {reason}")]
    InvalidRequest {
        /// Description of the problem.
        reason: String,
    },
}

impl OwError {
    /// Creates a new `MalformedFrame` error.
    ///
    /// # Example
    ///
    /// ```
    /// use ownet::OwError;
    ///
    /// let err = OwError::malformed_frame(3);
    /// ```
    pub fn malformed_frame(len: usize) -> Self {
        Self::MalformedFrame { len }
    }

    /// Creates a new `ShortRead` error.
    pub fn short_read(expected: usize, received: usize) -> Self {
        Self::ShortRead { expected, received }
    }

    /// Creates a new `UnknownSensor` error.
    ///
    /// # Example
    ///
    /// ```
    /// use ownet::OwError;
    ///
    /// let err = OwError::unknown_sensor("/10.67C6697351FF");
    /// assert!(err.is_unknown_sensor());
    /// ```
    pub fn unknown_sensor(path: impl Into<String>) -> Self {
        Self::UnknownSensor { path: path.into() }
    }

    /// Creates a new `UnknownAttribute` error.
    pub fn unknown_attribute(name: impl Into<String>) -> Self {
        Self::UnknownAttribute { name: name.into() }
    }

    /// Creates a new `NoController` error.
    pub fn no_controller(interface: impl Into<String>) -> Self {
        Self::NoController {
            interface: interface.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Returns whether this error is an `UnknownSensor`.
    pub fn is_unknown_sensor(&self) -> bool {
        matches!(self, Self::UnknownSensor { .. })
    }

    /// Returns whether this error is an `UnknownAttribute`.
    pub fn is_unknown_attribute(&self) -> bool {
        matches!(self, Self::UnknownAttribute { .. })
    }
}
