//! # ownet
//!
//! A Rust client for the owserver network protocol of the OWFS 1-Wire
//! filesystem.
//!
//! An owserver exposes the devices on a 1-Wire bus as a virtual filesystem:
//! every device is a directory, every property a file. This crate speaks the
//! binary protocol directly over TCP, without any native 1-Wire library.
//!
//! Each call opens exactly one TCP connection, sends one request and closes
//! the connection once the response has been read. There are no retries, no
//! client-side caching and no persistent sockets.
//!
//! ## Features
//!
//! - **Protocol codec** - 24-byte frame headers and request payloads
//! - **Connection** - read, write, dir and presence against one server
//! - **Value coercion** - padded ASCII properties become integers, floats or text
//! - **Sensor tree** - attribute lookup, cache modes, coupler branches and search
//! - **No panics** - all errors returned as `Result<T, OwError>`
//!
//! ## Quick Start
//!
//! ```no_run
//! use ownet::{Connection, ConnectionConfig};
//!
//! fn main() -> ownet::Result<()> {
//!     let conn = Connection::new(ConnectionConfig::new("localhost"));
//!
//!     // Top level of the bus
//!     for entry in conn.dir("/")? {
//!         println!("{}", entry);
//!     }
//!
//!     // A coerced property value
//!     if let Some(temp) = conn.read_value("/10.67C6697351FF/temperature")? {
//!         println!("temperature = {}", temp);
//!     }
//!
//!     // Switch a PIO channel
//!     conn.write("/29.400900000000/PIO.0", 1)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Sensors
//!
//! [`Sensor`] wraps a path and discovers its attributes from the directory
//! listing:
//!
//! ```no_run
//! use ownet::{Sensor, Value};
//!
//! ownet::init("localhost:4304")?;
//!
//! let root = Sensor::new("/")?;
//! for sensor in root.children() {
//!     let sensor = sensor?;
//!     println!("{}", sensor);
//!     if sensor.has_attribute("temperature") {
//!         println!("  {}", sensor.get_attribute("temperature")?);
//!     }
//! }
//!
//! for switch in root.find([("type", Some(Value::from("DS2408")))], false) {
//!     println!("switch at {}", switch?.path());
//! }
//!
//! ownet::finish();
//! # Ok::<(), ownet::OwError>(())
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use ownet::{OwError, Sensor};
//!
//! match Sensor::new("/10.67C6697351FF") {
//!     Ok(sensor) => println!("{}", sensor),
//!     Err(OwError::NotInitialized) => println!("call ownet::init first"),
//!     Err(OwError::UnknownSensor { path }) => println!("nothing at {}", path),
//!     Err(OwError::Transport(e)) => println!("connection failed: {}", e),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```
//!
//! ## Configuration
//!
//! ```
//! use ownet::ConnectionConfig;
//! use std::time::Duration;
//!
//! let config = ConnectionConfig::new("192.168.1.20")
//!     .with_port(4305)                       // Custom port (default: 4304)
//!     .with_timeout(Duration::from_secs(5)); // Socket timeout (default: OS)
//! assert_eq!(config.to_string(), "192.168.1.20:4305");
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod check;
mod connection;
mod error;
mod header;
mod message;
pub mod response;
pub mod sensor;
mod transport;
mod value;

#[cfg(test)]
mod mock;

// Public re-exports
pub use check::{check_sensor, CheckReport, Status, Thresholds};
pub use connection::{default_config, finish, init, init_with, Connection, ConnectionConfig};
pub use error::{OwError, Result};
pub use header::{
    decode_header, encode_header, OwHeader, ResponseHeader, FORMAT_FLAGS, HEADER_SIZE,
    PROTOCOL_VERSION,
};
pub use message::{MessageType, Request, DEFAULT_READ_SIZE};
pub use response::Response;
pub use sensor::{Sensor, COUPLER_TYPE, DEFAULT_BRANCHES};
pub use transport::{TcpTransport, DEFAULT_OWSERVER_PORT};
pub use value::{coerce, trim_payload, Value};
