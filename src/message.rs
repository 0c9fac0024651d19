//! owserver message types and request framing.
//!
//! A [`Request`] carries everything needed to put one message on the wire:
//! the function code, the target path, an optional value and the maximum
//! response size the client is willing to accept. Each request serializes
//! itself to a 24-byte header followed by its NUL-terminated payload.
//!
//! # Example
//!
//! ```
//! use ownet::{MessageType, Request, HEADER_SIZE};
//!
//! let request = Request::read("/10.67C6697351FF/temperature");
//! assert_eq!(request.function(), MessageType::Read);
//!
//! let bytes = request.to_bytes().unwrap();
//! assert_eq!(bytes.len(), HEADER_SIZE + "/10.67C6697351FF/temperature".len() + 1);
//! ```

use crate::error::{OwError, Result};
use crate::header::{OwHeader, HEADER_SIZE};

/// Maximum response size requested for reads.
pub const DEFAULT_READ_SIZE: i32 = 8192;

/// owserver function codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Error (0).
    Error,
    /// No operation (1).
    Nop,
    /// Read a property (2).
    Read,
    /// Write a property (3).
    Write,
    /// List a directory (4).
    Dir,
    /// Query a property size (5).
    Size,
    /// Check whether a path exists (6).
    Presence,
}

impl MessageType {
    /// Returns the wire code for this function.
    pub fn code(self) -> i32 {
        match self {
            Self::Error => 0,
            Self::Nop => 1,
            Self::Read => 2,
            Self::Write => 3,
            Self::Dir => 4,
            Self::Size => 5,
            Self::Presence => 6,
        }
    }

    /// Looks up a function from its wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Error),
            1 => Some(Self::Nop),
            2 => Some(Self::Read),
            3 => Some(Self::Write),
            4 => Some(Self::Dir),
            5 => Some(Self::Size),
            6 => Some(Self::Presence),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Nop => "nop",
            Self::Read => "read",
            Self::Write => "write",
            Self::Dir => "dir",
            Self::Size => "size",
            Self::Presence => "presence",
        };
        f.write_str(name)
    }
}

/// A single owserver request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    function: MessageType,
    path: String,
    value: Option<String>,
    max_response_size: i32,
}

impl Request {
    /// Creates a read request for `path`.
    pub fn read(path: impl Into<String>) -> Self {
        Self {
            function: MessageType::Read,
            path: path.into(),
            value: None,
            max_response_size: DEFAULT_READ_SIZE,
        }
    }

    /// Creates a write request storing `value` at `path`.
    ///
    /// # Example
    ///
    /// ```
    /// use ownet::Request;
    ///
    /// let request = Request::write("/29.400900000000/PIO.1", "1");
    /// let bytes = request.to_bytes().unwrap();
    /// assert!(bytes.ends_with(b"/29.400900000000/PIO.1\x001\x00"));
    /// ```
    pub fn write(path: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            function: MessageType::Write,
            path: path.into(),
            max_response_size: i32::try_from(value.len() + 1).unwrap_or(-1),
            value: Some(value),
        }
    }

    /// Creates a directory listing request for `path`.
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            function: MessageType::Dir,
            path: path.into(),
            value: None,
            max_response_size: 0,
        }
    }

    /// Creates a presence request for `path`.
    pub fn presence(path: impl Into<String>) -> Self {
        Self {
            function: MessageType::Presence,
            path: path.into(),
            value: None,
            max_response_size: 0,
        }
    }

    /// Returns the function code.
    pub fn function(&self) -> MessageType {
        self.function
    }

    /// Returns the target path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the value carried by a write request.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns the data length announced in the header.
    pub fn max_response_size(&self) -> i32 {
        self.max_response_size
    }

    /// Returns the NUL-terminated payload bytes.
    pub fn payload(&self) -> Vec<u8> {
        let value_len = self.value.as_ref().map_or(0, |v| v.len() + 1);
        let mut payload = Vec::with_capacity(self.path.len() + 1 + value_len);
        payload.extend_from_slice(self.path.as_bytes());
        payload.push(0);
        if let Some(value) = &self.value {
            payload.extend_from_slice(value.as_bytes());
            payload.push(0);
        }
        payload
    }

    /// Builds the request header.
    ///
    /// # Errors
    ///
    /// Returns `OwError::InvalidRequest` if the payload does not fit a
    /// signed 32-bit length.
    pub fn header(&self) -> Result<OwHeader> {
        let value_len = self.value.as_ref().map_or(0, |v| v.len() + 1);
        let payload_len = i32::try_from(self.path.len() + 1 + value_len).map_err(|_| {
            OwError::invalid_request(format!("payload for '{}' is too large", self.path))
        })?;
        if self.max_response_size < 0 {
            return Err(OwError::invalid_request("value is too large"));
        }
        Ok(OwHeader::request(
            self.function,
            payload_len,
            self.max_response_size,
        ))
    }

    /// Serializes the header and payload for transmission.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let header = self.header()?;
        let payload = self.payload();
        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&header.to_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }
}
