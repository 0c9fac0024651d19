//! owserver frame header encoding and decoding.
//!
//! Every request and every response exchanged with an owserver starts with a
//! fixed 24-byte header made of six 32-bit integers in network byte order:
//!
//! | Offset | Request field | Response field |
//! |--------|---------------|----------------|
//! | 0 | protocol version | protocol version |
//! | 4 | payload length | payload length (negative = ping) |
//! | 8 | function code | return value (negative = error) |
//! | 12 | format flags | format flags |
//! | 16 | data length | data length |
//! | 20 | offset | offset |
//!
//! This module is pure: it performs no I/O and keeps no state.
//!
//! # Example
//!
//! ```
//! use ownet::{decode_header, encode_header, MessageType, HEADER_SIZE};
//!
//! let bytes = encode_header(MessageType::Read, 9, 8192);
//! assert_eq!(bytes.len(), HEADER_SIZE);
//!
//! let header = decode_header(&bytes).unwrap();
//! assert_eq!(header.return_value, 2);
//! assert_eq!(header.payload_len, 9);
//! assert_eq!(header.data_len, 8192);
//! ```

use crate::error::{OwError, Result};
use crate::message::MessageType;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 24;

/// Protocol version sent on every request.
pub const PROTOCOL_VERSION: i32 = 0;

/// Format flags sent on every request (no persistence, safe mode).
pub const FORMAT_FLAGS: i32 = 258;

/// Raw six-field owserver header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwHeader {
    /// Protocol version.
    pub version: i32,
    /// Payload length following the header.
    pub payload_len: i32,
    /// Function code on requests, return value on responses.
    pub function: i32,
    /// Format flags.
    pub format_flags: i32,
    /// Requested or returned data length.
    pub data_len: i32,
    /// Read/write offset.
    pub offset: i32,
}

impl OwHeader {
    /// Creates a request header with the fixed version, flags and offset.
    ///
    /// # Example
    ///
    /// ```
    /// use ownet::{MessageType, OwHeader, FORMAT_FLAGS};
    ///
    /// let header = OwHeader::request(MessageType::Dir, 2, 0);
    /// assert_eq!(header.function, 4);
    /// assert_eq!(header.format_flags, FORMAT_FLAGS);
    /// ```
    pub fn request(function: MessageType, payload_len: i32, data_len: i32) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload_len,
            function: function.code(),
            format_flags: FORMAT_FLAGS,
            data_len,
            offset: 0,
        }
    }

    /// Serializes the header in network byte order.
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let fields = [
            self.version,
            self.payload_len,
            self.function,
            self.format_flags,
            self.data_len,
            self.offset,
        ];
        let mut bytes = [0u8; HEADER_SIZE];
        for (chunk, field) in bytes.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&field.to_be_bytes());
        }
        bytes
    }

    /// Parses a header from exactly 24 bytes.
    ///
    /// # Errors
    ///
    /// Returns `OwError::MalformedFrame` if the slice is not 24 bytes long.
    ///
    /// # Example
    ///
    /// ```
    /// use ownet::OwHeader;
    ///
    /// assert!(OwHeader::from_bytes(&[0u8; 10]).is_err());
    /// assert!(OwHeader::from_bytes(&[0u8; 24]).is_ok());
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != HEADER_SIZE {
            return Err(OwError::malformed_frame(data.len()));
        }

        let field = |index: usize| {
            let start = index * 4;
            i32::from_be_bytes([
                data[start],
                data[start + 1],
                data[start + 2],
                data[start + 3],
            ])
        };

        Ok(Self {
            version: field(0),
            payload_len: field(1),
            function: field(2),
            format_flags: field(3),
            data_len: field(4),
            offset: field(5),
        })
    }
}

/// The parts of a response header a client acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Return value; negative values are server error codes.
    pub return_value: i32,
    /// Length of the payload that follows; negative for a ping.
    pub payload_len: i32,
    /// Number of meaningful bytes at the start of the payload.
    pub data_len: i32,
}

impl ResponseHeader {
    /// Returns whether the server sent a keep-alive with no data.
    pub fn is_ping(self) -> bool {
        self.payload_len < 0
    }

    /// Returns whether the server reported an error.
    pub fn is_error(self) -> bool {
        self.return_value < 0
    }
}

impl From<OwHeader> for ResponseHeader {
    fn from(header: OwHeader) -> Self {
        Self {
            return_value: header.function,
            payload_len: header.payload_len,
            data_len: header.data_len,
        }
    }
}

/// Encodes a request header for `function`.
pub fn encode_header(function: MessageType, payload_len: i32, data_len: i32) -> [u8; HEADER_SIZE] {
    OwHeader::request(function, payload_len, data_len).to_bytes()
}

/// Decodes a response header.
///
/// Fields are read as two's-complement values, so any bit pattern decodes;
/// a return value above `i32::MAX` when read unsigned comes back negative.
///
/// # Errors
///
/// Returns `OwError::MalformedFrame` if `data` is not exactly 24 bytes.
pub fn decode_header(data: &[u8]) -> Result<ResponseHeader> {
    OwHeader::from_bytes(data).map(ResponseHeader::from)
}
