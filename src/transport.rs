//! TCP transport layer for owserver communication.
//!
//! This module provides the [`TcpTransport`] struct which opens one TCP
//! connection per exchange. The transport knows about sockets and framing
//! but nothing about what a path or a value means.
//!
//! # Design
//!
//! - **One request per connection** - every exchange opens a fresh socket,
//!   sends exactly one request and closes the socket before returning
//! - **Synchronous** - blocking I/O; the timeout is left to the OS unless set
//! - **No retries** - connection failures surface as `OwError::Transport`
//!
//! # Example
//!
//! ```no_run
//! use ownet::{Request, TcpTransport};
//!
//! let transport = TcpTransport::new("localhost", 4304, None);
//! let response = transport.exchange(&Request::read("/system/adapter/name"), |stream| {
//!     let header = ownet::response::read_header(stream)?;
//!     ownet::response::read_payload(stream, header)
//! })?;
//! # Ok::<(), ownet::OwError>(())
//! ```

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::error::{OwError, Result};
use crate::message::Request;

/// Default owserver TCP port.
pub const DEFAULT_OWSERVER_PORT: u16 = 4304;

/// TCP transport for owserver communication.
#[derive(Clone)]
pub struct TcpTransport {
    host: String,
    port: u16,
    timeout: Option<Duration>,
}

impl TcpTransport {
    /// Creates a transport for `host:port`.
    ///
    /// No connection is made until [`exchange`](Self::exchange) is called.
    /// A `None` timeout keeps the operating system defaults.
    pub fn new(host: impl Into<String>, port: u16, timeout: Option<Duration>) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Opens a connection to the server.
    ///
    /// # Errors
    ///
    /// Returns `OwError::Transport` if the connection cannot be established
    /// or configured.
    pub fn open(&self) -> Result<TcpStream> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))?;
        if self.timeout.is_some() {
            stream.set_read_timeout(self.timeout)?;
            stream.set_write_timeout(self.timeout)?;
        }
        Ok(stream)
    }

    /// Sends `request` on a fresh connection and hands the stream to
    /// `receive` to collect the response.
    ///
    /// The connection is closed before this returns, whether `receive`
    /// succeeded or not.
    pub fn exchange<T, F>(&self, request: &Request, receive: F) -> Result<T>
    where
        F: FnOnce(&mut TcpStream) -> Result<T>,
    {
        let bytes = request.to_bytes()?;
        let mut stream = self.open()?;
        log::debug!(
            "owserver {}:{} {} '{}'",
            self.host,
            self.port,
            request.function(),
            request.path()
        );

        let result = stream
            .write_all(&bytes)
            .map_err(OwError::from)
            .and_then(|()| receive(&mut stream));

        // The peer may already have closed its side.
        let _ = stream.shutdown(Shutdown::Both);
        result
    }

    /// Returns the server host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the server port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the configured socket timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .finish()
    }
}
