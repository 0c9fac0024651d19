//! owserver connection handling.
//!
//! This module provides [`ConnectionConfig`], which says where the owserver
//! lives, and [`Connection`], which performs the protocol operations:
//!
//! - [`read`](Connection::read) - fetch a property's raw bytes
//! - [`write`](Connection::write) - store a property value
//! - [`dir`](Connection::dir) - list the children of a path
//! - [`presence`](Connection::presence) - check whether a path exists
//!
//! Every operation opens its own TCP connection, performs exactly one
//! request/response cycle and closes the connection again.
//!
//! # Example
//!
//! ```no_run
//! use ownet::{Connection, ConnectionConfig};
//!
//! let connection = Connection::new(ConnectionConfig::new("localhost"));
//!
//! for entry in connection.dir("/")? {
//!     println!("{}", entry);
//! }
//! let temperature = connection.read_value("/10.67C6697351FF/temperature")?;
//! # Ok::<(), ownet::OwError>(())
//! ```
//!
//! # Process-wide defaults
//!
//! [`init`] stores a default configuration that [`Sensor::new`](crate::Sensor::new)
//! uses when no connection is given explicitly; [`finish`] clears it.

use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::error::{OwError, Result};
use crate::message::Request;
use crate::response::{read_header, read_payload};
use crate::transport::{TcpTransport, DEFAULT_OWSERVER_PORT};
use crate::value::{coerce, Value};

/// Configuration for reaching an owserver.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionConfig {
    /// Server host name or address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Socket timeout; `None` keeps the operating system defaults.
    pub timeout: Option<Duration>,
}

impl ConnectionConfig {
    /// Creates a configuration for `host` on the default port (4304).
    ///
    /// # Example
    ///
    /// ```
    /// use ownet::ConnectionConfig;
    ///
    /// let config = ConnectionConfig::new("localhost");
    /// assert_eq!(config.port, 4304);
    /// ```
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_OWSERVER_PORT,
            timeout: None,
        }
    }

    /// Sets a custom port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets a socket timeout.
    ///
    /// # Example
    ///
    /// ```
    /// use ownet::ConnectionConfig;
    /// use std::time::Duration;
    ///
    /// let config = ConnectionConfig::new("localhost")
    ///     .with_port(3003)
    ///     .with_timeout(Duration::from_secs(5));
    /// ```
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Parses an interface string of the form `host:port`.
    ///
    /// # Errors
    ///
    /// Returns `OwError::NoController` unless the string is exactly one
    /// non-empty host and a numeric port separated by `:`.
    ///
    /// # Example
    ///
    /// ```
    /// use ownet::ConnectionConfig;
    ///
    /// let config = ConnectionConfig::from_interface("remote_system:3003").unwrap();
    /// assert_eq!(config.host, "remote_system");
    /// assert_eq!(config.port, 3003);
    ///
    /// assert!(ConnectionConfig::from_interface("u").is_err());
    /// ```
    pub fn from_interface(interface: &str) -> Result<Self> {
        let parts: Vec<&str> = interface.split(':').collect();
        let [host, port] = parts.as_slice() else {
            return Err(OwError::no_controller(interface));
        };
        if host.is_empty() {
            return Err(OwError::no_controller(interface));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| OwError::no_controller(interface))?;
        Ok(Self::new(*host).with_port(port))
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

static DEFAULT_CONFIG: RwLock<Option<ConnectionConfig>> = RwLock::new(None);

/// Sets the process-wide default connection from a `host:port` string.
///
/// # Errors
///
/// Returns `OwError::NoController` if the string cannot be parsed.
///
/// # Example
///
/// ```
/// ownet::init("localhost:4304").unwrap();
/// assert_eq!(ownet::default_config().unwrap().port, 4304);
/// ownet::finish();
/// ```
pub fn init(interface: &str) -> Result<()> {
    init_with(ConnectionConfig::from_interface(interface)?);
    Ok(())
}

/// Sets the process-wide default connection.
pub fn init_with(config: ConnectionConfig) {
    log::info!("default owserver set to {}", config);
    *DEFAULT_CONFIG
        .write()
        .unwrap_or_else(PoisonError::into_inner) = Some(config);
}

/// Clears the process-wide default connection.
pub fn finish() {
    log::info!("default owserver cleared");
    *DEFAULT_CONFIG
        .write()
        .unwrap_or_else(PoisonError::into_inner) = None;
}

/// Returns the process-wide default connection.
///
/// # Errors
///
/// Returns `OwError::NotInitialized` if [`init`] has not been called.
pub fn default_config() -> Result<ConnectionConfig> {
    DEFAULT_CONFIG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(OwError::NotInitialized)
}

/// Client for the owserver protocol operations.
///
/// Cloning is cheap; clones talk to the same server.
#[derive(Clone)]
pub struct Connection {
    config: ConnectionConfig,
    transport: TcpTransport,
}

impl Connection {
    /// Creates a connection. No socket is opened until an operation runs.
    pub fn new(config: ConnectionConfig) -> Self {
        let transport = TcpTransport::new(config.host.clone(), config.port, config.timeout);
        Self { config, transport }
    }

    /// Creates a connection from the process-wide defaults.
    ///
    /// # Errors
    ///
    /// Returns `OwError::NotInitialized` if [`init`] has not been called.
    pub fn from_defaults() -> Result<Self> {
        default_config().map(Self::new)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Reads the raw bytes of the property at `path`.
    ///
    /// Returns `Ok(None)` when the server answers with a ping instead of
    /// data, or with an error code and no payload.
    ///
    /// # Errors
    ///
    /// Returns `OwError::ShortRead` if the response is cut short and
    /// `OwError::Transport` on socket failures.
    pub fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let response = self.transport.exchange(&Request::read(path), |stream| {
            let header = read_header(stream)?;
            if header.is_ping() {
                return Ok(None);
            }
            let response = read_payload(stream, header)?;
            if header.is_error() && header.payload_len == 0 {
                return Ok(None);
            }
            Ok(response.into_data())
        })?;
        log::debug!(
            "read '{}' -> {:?} bytes",
            path,
            response.as_ref().map(Vec::len)
        );
        Ok(response)
    }

    /// Reads the property at `path` and coerces it to a [`Value`].
    pub fn read_value(&self, path: &str) -> Result<Option<Value>> {
        Ok(self.read(path)?.map(|raw| coerce(&raw)))
    }

    /// Writes `value` to the property at `path`, returning the server's
    /// return code.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ownet::{Connection, ConnectionConfig};
    ///
    /// let connection = Connection::new(ConnectionConfig::new("localhost"));
    /// let ret = connection.write("/29.400900000000/PIO.1", 1)?;
    /// # Ok::<(), ownet::OwError>(())
    /// ```
    pub fn write(&self, path: &str, value: impl fmt::Display) -> Result<i32> {
        let request = Request::write(path, value.to_string());
        let header = self.transport.exchange(&request, |stream| read_header(stream))?;
        log::debug!("write '{}' -> {}", path, header.return_value);
        Ok(header.return_value)
    }

    /// Lists the entries below `path`, in server order.
    pub fn dir(&self, path: &str) -> Result<Vec<String>> {
        let entries = self.transport.exchange(&Request::dir(path), |stream| {
            let mut entries = Vec::new();
            loop {
                let header = read_header(stream)?;
                // End of listing, or a ping.
                if header.payload_len <= 0 {
                    break;
                }
                let response = read_payload(stream, header)?;
                if let Some(data) = response.data() {
                    entries.push(String::from_utf8_lossy(data).into_owned());
                }
            }
            Ok(entries)
        })?;
        log::debug!("dir '{}' -> {} entries", path, entries.len());
        Ok(entries)
    }

    /// Returns whether `path` exists on the server.
    pub fn presence(&self, path: &str) -> Result<bool> {
        let header = self
            .transport
            .exchange(&Request::presence(path), |stream| read_header(stream))?;
        Ok(header.return_value >= 0)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.config, f)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.transport.host())
            .field("port", &self.transport.port())
            .field("timeout", &self.transport.timeout())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{frame, FakeOwserver, ScriptedServer};
    use serial_test::serial;

    fn scripted(response: Vec<u8>) -> (ScriptedServer, Connection) {
        let server = ScriptedServer::reply(response);
        let config = ConnectionConfig::new("127.0.0.1").with_port(server.port());
        let connection = Connection::new(config);
        (server, connection)
    }

    #[test]
    fn test_config_new() {
        let config = ConnectionConfig::new("owhost");
        assert_eq!(config.host, "owhost");
        assert_eq!(config.port, DEFAULT_OWSERVER_PORT);
        assert_eq!(config.timeout, None);
        assert_eq!(config.to_string(), "owhost:4304");
    }

    #[test]
    fn test_config_builders() {
        let config = ConnectionConfig::new("owhost")
            .with_port(3003)
            .with_timeout(Duration::from_secs(3));
        assert_eq!(config.port, 3003);
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_from_interface_rejects_malformed() {
        for bad in ["localhost", "a:b:c", ":4304", "host:port", "host:99999", ""] {
            assert!(
                matches!(
                    ConnectionConfig::from_interface(bad),
                    Err(OwError::NoController { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    #[serial]
    fn test_init_and_finish() {
        finish();
        assert!(matches!(default_config(), Err(OwError::NotInitialized)));
        assert!(matches!(
            Connection::from_defaults(),
            Err(OwError::NotInitialized)
        ));

        init("xyzzy:9876").unwrap();
        let config = default_config().unwrap();
        assert_eq!(config.host, "xyzzy");
        assert_eq!(config.port, 9876);

        finish();
        assert!(matches!(default_config(), Err(OwError::NotInitialized)));
    }

    #[test]
    #[serial]
    fn test_init_rejects_bad_interface() {
        finish();
        assert!(matches!(init("nohost"), Err(OwError::NoController { .. })));
        assert!(matches!(default_config(), Err(OwError::NotInitialized)));
    }

    #[test]
    fn test_read_returns_data_len_bytes() {
        let (server, connection) = scripted(frame(12, 13, 12, b"     23.5000\0"));
        let data = connection.read("/10.A/temperature").unwrap();
        assert_eq!(data, Some(b"     23.5000".to_vec()));

        let sent = server.received();
        assert_eq!(sent, Request::read("/10.A/temperature").to_bytes().unwrap());
    }

    #[test]
    fn test_read_ping_is_none() {
        let (_server, connection) = scripted(frame(0, -1, 0, &[]));
        assert_eq!(connection.read("/10.A/temperature").unwrap(), None);
    }

    #[test]
    fn test_read_error_code_is_none() {
        let (_server, connection) = scripted(frame(-2, 0, 0, &[]));
        assert_eq!(connection.read("/nothere").unwrap(), None);
    }

    #[test]
    fn test_read_short_header() {
        let (_server, connection) = scripted(vec![0u8; 10]);
        assert!(matches!(
            connection.read("/10.A/temperature"),
            Err(OwError::ShortRead {
                expected: 24,
                received: 10
            })
        ));
    }

    #[test]
    fn test_read_value_coerces() {
        let (_server, connection) = scripted(frame(12, 12, 12, b"     23.5000"));
        assert_eq!(
            connection.read_value("/10.A/temperature").unwrap(),
            Some(Value::Float(23.5))
        );
    }

    #[test]
    fn test_write_returns_code_and_sends_value() {
        let (server, connection) = scripted(frame(0, 0, 0, &[]));
        assert_eq!(connection.write("/29.B/PIO.1", 1).unwrap(), 0);

        let sent = server.received();
        assert_eq!(sent, Request::write("/29.B/PIO.1", "1").to_bytes().unwrap());
    }

    #[test]
    fn test_write_negative_code() {
        let (_server, connection) = scripted(frame(-13, 0, 0, &[]));
        assert_eq!(connection.write("/10.A/temperature", "5").unwrap(), -13);
    }

    #[test]
    fn test_dir_two_entries_then_terminator() {
        let mut stream = frame(0, 6, 5, b"/10.A\0");
        stream.extend(frame(0, 6, 5, b"/29.B\0"));
        stream.extend(frame(0, 0, 0, &[]));
        let (server, connection) = scripted(stream);

        assert_eq!(connection.dir("/").unwrap(), vec!["/10.A", "/29.B"]);
        assert_eq!(server.received(), Request::dir("/").to_bytes().unwrap());
    }

    #[test]
    fn test_dir_stops_on_ping() {
        let mut stream = frame(0, 6, 5, b"/10.A\0");
        stream.extend(frame(0, -1, 0, &[]));
        let (_server, connection) = scripted(stream);
        assert_eq!(connection.dir("/").unwrap(), vec!["/10.A"]);
    }

    #[test]
    fn test_dir_short_stream() {
        let stream = frame(0, 6, 5, b"/10.A\0");
        let (_server, connection) = scripted(stream);
        assert!(matches!(
            connection.dir("/"),
            Err(OwError::ShortRead { received: 0, .. })
        ));
    }

    #[test]
    fn test_presence() {
        let server = FakeOwserver::new()
            .value("/10.A/type", "DS18S20")
            .start();
        let connection = Connection::new(server.config());
        assert!(connection.presence("/10.A/type").unwrap());
        assert!(!connection.presence("/10.Z/type").unwrap());
    }

    #[test]
    fn test_each_operation_opens_own_connection() {
        let server = FakeOwserver::new()
            .value("/10.A/temperature", "20.0")
            .dir("/", &["/10.A"])
            .start();
        let connection = Connection::new(server.config());

        connection.read("/10.A/temperature").unwrap();
        connection.dir("/").unwrap();
        connection.write("/10.A/temperature", 21.5).unwrap();

        assert_eq!(server.requests().len(), 3);
        assert_eq!(server.stored("/10.A/temperature").as_deref(), Some("21.5"));
    }

    #[test]
    fn test_connection_display_and_debug() {
        let config = ConnectionConfig::new("xyzzy")
            .with_port(9876)
            .with_timeout(Duration::from_secs(2));
        let connection = Connection::new(config);
        assert_eq!(connection.to_string(), "xyzzy:9876");

        let debug_str = format!("{:?}", connection);
        assert!(debug_str.contains("Connection"));
        assert!(debug_str.contains("\"xyzzy\""));
        assert!(debug_str.contains("9876"));
        assert!(debug_str.contains("2s"));
    }
}
