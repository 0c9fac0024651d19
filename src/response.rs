//! owserver response framing.
//!
//! A response is a [`ResponseHeader`] optionally followed by a payload of
//! `payload_len` bytes, of which only the first `data_len` bytes carry data
//! (the rest is padding such as a trailing NUL).
//!
//! # Example
//!
//! ```
//! use ownet::{Response, ResponseHeader};
//!
//! let header = ResponseHeader { return_value: 6, payload_len: 7, data_len: 6 };
//! let response = Response::new(header, b"DS2409\0".to_vec());
//! assert_eq!(response.data(), Some(&b"DS2409"[..]));
//! ```

use std::io::Read;

use crate::error::{OwError, Result};
use crate::header::{decode_header, ResponseHeader, HEADER_SIZE};

/// A decoded owserver response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response header.
    pub header: ResponseHeader,
    data: Option<Vec<u8>>,
}

impl Response {
    /// Builds a response from its header and raw payload, truncating the
    /// payload to the header's data length.
    pub fn new(header: ResponseHeader, mut payload: Vec<u8>) -> Self {
        let data_len = usize::try_from(header.data_len).unwrap_or(0);
        payload.truncate(data_len);
        Self {
            header,
            data: Some(payload),
        }
    }

    /// Builds a response that carries no payload.
    pub fn empty(header: ResponseHeader) -> Self {
        Self { header, data: None }
    }

    /// Returns the server return value.
    pub fn return_value(&self) -> i32 {
        self.header.return_value
    }

    /// Returns whether this was a keep-alive without data.
    pub fn is_ping(&self) -> bool {
        self.header.is_ping()
    }

    /// Returns the payload data, if a payload was read.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Consumes the response, returning its payload data.
    pub fn into_data(self) -> Option<Vec<u8>> {
        self.data
    }
}

/// Fills `buf` completely, reporting how far it got on early end of stream.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut received = 0;
    while received < buf.len() {
        match reader.read(&mut buf[received..]) {
            Ok(0) => return Err(OwError::short_read(buf.len(), received)),
            Ok(n) => received += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(OwError::Transport(e)),
        }
    }
    Ok(())
}

/// Reads one 24-byte response header.
///
/// # Errors
///
/// Returns `OwError::ShortRead` if the stream ends before 24 bytes arrive.
pub fn read_header<R: Read>(reader: &mut R) -> Result<ResponseHeader> {
    let mut buf = [0u8; HEADER_SIZE];
    read_full(reader, &mut buf)?;
    let header = decode_header(&buf)?;
    log::trace!(
        "response header: ret={} payload={} data={}",
        header.return_value,
        header.payload_len,
        header.data_len
    );
    Ok(header)
}

/// Reads the payload announced by `header`, truncated to its data length.
pub fn read_payload<R: Read>(reader: &mut R, header: ResponseHeader) -> Result<Response> {
    let payload_len = usize::try_from(header.payload_len).unwrap_or(0);
    let mut payload = vec![0u8; payload_len];
    read_full(reader, &mut payload)?;
    Ok(Response::new(header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{OwHeader, FORMAT_FLAGS};
    use std::io::Cursor;

    fn frame(ret: i32, payload_len: i32, data_len: i32, payload: &[u8]) -> Vec<u8> {
        let header = OwHeader {
            version: 0,
            payload_len,
            function: ret,
            format_flags: FORMAT_FLAGS,
            data_len,
            offset: 0,
        };
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_read_header() {
        let mut cursor = Cursor::new(frame(12, 13, 12, &[]));
        let header = read_header(&mut cursor).unwrap();
        assert_eq!(header.return_value, 12);
        assert_eq!(header.payload_len, 13);
        assert_eq!(header.data_len, 12);
    }

    #[test]
    fn test_read_header_short() {
        let bytes = frame(0, 0, 0, &[]);
        let mut cursor = Cursor::new(bytes[..10].to_vec());
        match read_header(&mut cursor) {
            Err(OwError::ShortRead { expected, received }) => {
                assert_eq!(expected, 24);
                assert_eq!(received, 10);
            }
            other => panic!("Expected ShortRead, got {:?}", other),
        }
    }

    #[test]
    fn test_read_payload_truncates_to_data_len() {
        let mut cursor = Cursor::new(frame(7, 12, 7, b"  23.5 \0\0\0\0\0"));
        let header = read_header(&mut cursor).unwrap();
        let response = read_payload(&mut cursor, header).unwrap();
        assert_eq!(response.return_value(), 7);
        assert_eq!(response.data(), Some(&b"  23.5 "[..]));
    }

    #[test]
    fn test_read_payload_short() {
        let mut cursor = Cursor::new(frame(0, 8, 8, b"abc"));
        let header = read_header(&mut cursor).unwrap();
        assert!(matches!(
            read_payload(&mut cursor, header),
            Err(OwError::ShortRead {
                expected: 8,
                received: 3
            })
        ));
    }

    #[test]
    fn test_empty_response() {
        let header = ResponseHeader {
            return_value: 0,
            payload_len: -1,
            data_len: 0,
        };
        let response = Response::empty(header);
        assert!(response.is_ping());
        assert_eq!(response.data(), None);
    }
}
