//! Navigable view of the owserver sensor tree.
//!
//! A [`Sensor`] stands for one path in the virtual filesystem an owserver
//! exposes: the bus master at `/`, a device such as `/10.67C6697351FF`, or a
//! device behind a coupler branch such as `/1F.440701000000/main/29.400900000000`.
//!
//! On construction the sensor reads its type and lists its directory to
//! build an attribute index. Property names are made identifier-safe by
//! replacing the sub-address separator, so `PIO.0` becomes `PIO_0`:
//!
//! ```no_run
//! use ownet::{ConnectionConfig, Sensor, Value};
//!
//! let config = ConnectionConfig::new("localhost");
//! let mut switch = Sensor::with_config("/29.400900000000", config)?;
//!
//! let state = switch.get_attribute("PIO_0")?;
//! switch.set_attribute("PIO_1", 1)?;
//!
//! let root = Sensor::with_config("/", ConnectionConfig::new("localhost"))?;
//! for coupler in root.find([("type", Some(Value::from("DS2409")))], false) {
//!     println!("{}", coupler?);
//! }
//! # Ok::<(), ownet::OwError>(())
//! ```
//!
//! # Cache modes
//!
//! A sensor reads through the owserver cache unless it was created from an
//! `/uncached/...` path or switched with [`Sensor::set_cache_mode`]. The mode
//! changes the path sent to the server, never the sensor's identity.
//!
//! # Traversal
//!
//! [`Sensor::list_entries`], [`Sensor::list_children`] and [`Sensor::find`]
//! return iterators. Each call issues a fresh directory listing; nothing is
//! memoized on the client side.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::connection::{Connection, ConnectionConfig};
use crate::error::{OwError, Result};
use crate::value::{trim_payload, Value};

/// Type tag of the coupler device whose branches hold further sensors.
pub const COUPLER_TYPE: &str = "DS2409";

/// Coupler branches searched by [`Sensor::children`].
pub const DEFAULT_BRANCHES: [&str; 2] = ["main", "aux"];

const UNCACHED_ROOT: &str = "/uncached";
const ADAPTER_NAME: &str = "/system/adapter/name";

/// Splits an optional `/uncached` prefix off `path`.
fn resolve_path(path: &str) -> (String, bool) {
    if path.is_empty() || path == "/" {
        ("/".to_string(), true)
    } else if path == UNCACHED_ROOT {
        ("/".to_string(), false)
    } else if let Some(rest) = path.strip_prefix("/uncached/") {
        (format!("/{}", rest), false)
    } else {
        (path.to_string(), true)
    }
}

fn effective_path(path: &str, use_cache: bool) -> String {
    match (use_cache, path) {
        (true, _) => path.to_string(),
        (false, "/") => UNCACHED_ROOT.to_string(),
        (false, _) => format!("{}{}", UNCACHED_ROOT, path),
    }
}

/// Joins `entry` onto `base`. Absolute entries replace the base.
/// Repeated separators are collapsed.
fn join_path(base: &str, entry: &str) -> String {
    let joined = if entry.starts_with('/') {
        entry.to_string()
    } else {
        format!("{}/{}", base, entry)
    };
    let mut path = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && path.ends_with('/') {
            continue;
        }
        path.push(c);
    }
    path
}

fn last_segment(entry: &str) -> &str {
    let trimmed = entry.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Makes a property name usable as an identifier (`PIO.0` -> `PIO_0`).
pub fn attribute_name(entry: &str) -> String {
    last_segment(entry).replace('.', "_")
}

/// Reads the type tag at `type_path`; no value means the sensor is unknown.
fn read_type(connection: &Connection, type_path: &str) -> Result<String> {
    match connection.read(type_path)? {
        Some(raw) => {
            let node_type = trim_payload(&raw);
            if node_type.is_empty() {
                Err(OwError::unknown_sensor(type_path))
            } else {
                Ok(node_type)
            }
        }
        None => Err(OwError::unknown_sensor(type_path)),
    }
}

/// A node of the owserver tree with dynamically discovered attributes.
#[derive(Clone)]
pub struct Sensor {
    connection: Connection,
    path: String,
    use_cache: bool,
    use_path: String,
    node_type: String,
    attrs: BTreeMap<String, String>,
    locals: HashMap<String, Value>,
}

impl Sensor {
    /// Resolves `path` using the process-wide default connection.
    ///
    /// # Errors
    ///
    /// Returns `OwError::NotInitialized` if [`init`](crate::init) has not
    /// been called, `OwError::UnknownSensor` if the node has no type, and
    /// protocol errors from the initial reads.
    pub fn new(path: &str) -> Result<Self> {
        Self::with_connection(path, Connection::from_defaults()?)
    }

    /// Resolves `path` against the server described by `config`.
    pub fn with_config(path: &str, config: ConnectionConfig) -> Result<Self> {
        Self::with_connection(path, Connection::new(config))
    }

    /// Resolves `path` over an existing connection.
    pub fn with_connection(path: &str, connection: Connection) -> Result<Self> {
        Self::resolve(path, connection, None)
    }

    /// Builds the node, skipping the type read when `node_type` is already known.
    fn resolve(path: &str, connection: Connection, node_type: Option<String>) -> Result<Self> {
        let (path, use_cache) = resolve_path(path);
        let mut sensor = Self {
            connection,
            use_path: path.clone(),
            path,
            use_cache,
            node_type: String::new(),
            attrs: BTreeMap::new(),
            locals: HashMap::new(),
        };
        sensor.load(use_cache, node_type)?;
        Ok(sensor)
    }

    /// Switches between cached and uncached reads.
    ///
    /// Re-reads the node type and rebuilds the attribute index against the
    /// new effective path. The sensor is left unchanged if any read fails.
    ///
    /// ```no_run
    /// use ownet::{ConnectionConfig, Sensor};
    ///
    /// let config = ConnectionConfig::new("localhost");
    /// let mut sensor = Sensor::with_config("/10.67C6697351FF", config)?;
    /// sensor.set_cache_mode(false)?;
    /// assert_eq!(sensor.effective_path(), "/uncached/10.67C6697351FF");
    /// # Ok::<(), ownet::OwError>(())
    /// ```
    pub fn set_cache_mode(&mut self, use_cache: bool) -> Result<()> {
        self.load(use_cache, None)
    }

    fn load(&mut self, use_cache: bool, node_type: Option<String>) -> Result<()> {
        let use_path = effective_path(&self.path, use_cache);
        let node_type = match node_type {
            Some(node_type) if !self.is_root() => node_type,
            _ => {
                let type_path = if self.is_root() {
                    ADAPTER_NAME.to_string()
                } else {
                    join_path(&use_path, "type")
                };
                read_type(&self.connection, &type_path)?
            }
        };

        let listing = self.connection.dir(&use_path)?;
        let attrs = Entries::new(listing, &use_path, self.is_root())
            .map(|name| (attribute_name(&name), join_path(&use_path, &name)))
            .collect();

        self.use_cache = use_cache;
        self.use_path = use_path;
        self.node_type = node_type;
        self.attrs = attrs;
        Ok(())
    }

    /// Returns the node path without any `/uncached` prefix.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the path actually sent to the server.
    pub fn effective_path(&self) -> &str {
        &self.use_path
    }

    /// Returns whether reads go through the owserver cache.
    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    /// Returns the device type, e.g. `DS2409`, or the adapter name for `/`.
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// Returns whether this is the bus master node.
    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Returns whether this node is a coupler with switchable branches.
    pub fn is_coupler(&self) -> bool {
        self.node_type == COUPLER_TYPE
    }

    /// Returns the connection this sensor talks through.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns the attribute index: identifier-safe name to full path.
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    /// Returns the attribute names in sorted order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }

    /// Returns whether `name` is a device attribute of this node.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// Reads the device attribute `name` and coerces its value.
    ///
    /// # Errors
    ///
    /// Returns `OwError::UnknownAttribute` if `name` is not in the attribute
    /// index or the server returns no value for it.
    pub fn get_attribute(&self, name: &str) -> Result<Value> {
        let path = self
            .attrs
            .get(name)
            .ok_or_else(|| OwError::unknown_attribute(name))?;
        self.connection
            .read_value(path)?
            .ok_or_else(|| OwError::unknown_attribute(name))
    }

    /// Sets `name` to `value`.
    ///
    /// Device attributes are written to the server. Any other name is kept
    /// as node-local state and can be read back with [`Sensor::local`].
    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match self.attrs.get(name) {
            Some(path) => {
                let ret = self.connection.write(path, &value)?;
                if ret < 0 {
                    log::warn!("write of '{}' to {} returned {}", value, path, ret);
                }
            }
            None => {
                self.locals.insert(name.to_string(), value);
            }
        }
        Ok(())
    }

    /// Returns node-local state stored by [`Sensor::set_attribute`].
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    /// Lists the names of this node's entries.
    ///
    /// For the root only direct adapter children are yielded; for any other
    /// node the last path segment of every entry.
    pub fn list_entries(&self) -> Result<Entries> {
        let listing = self.connection.dir(&self.use_path)?;
        Ok(Entries::new(listing, &self.use_path, self.is_root()))
    }

    /// Collects [`Sensor::list_entries`].
    ///
    /// ```no_run
    /// use ownet::{ConnectionConfig, Sensor};
    ///
    /// let sensor = Sensor::with_config("/10.B7B64D000800", ConnectionConfig::new("localhost"))?;
    /// // ["address", "crc8", "die", "family", "id", "power", "present", "temperature", ...]
    /// println!("{:?}", sensor.entry_list()?);
    /// # Ok::<(), ownet::OwError>(())
    /// ```
    pub fn entry_list(&self) -> Result<Vec<String>> {
        Ok(self.list_entries()?.collect())
    }

    /// Yields the sensors attached to this node.
    ///
    /// A coupler lists each of `branches` below its own path; any other node
    /// lists its own directory. Candidates without a `type` are skipped.
    pub fn list_children<S: AsRef<str>>(&self, branches: &[S]) -> Sensors {
        let pending: VecDeque<String> = if self.is_coupler() {
            branches
                .iter()
                .map(|branch| join_path(&self.use_path, branch.as_ref()))
                .collect()
        } else {
            VecDeque::from([self.use_path.clone()])
        };
        Sensors {
            connection: self.connection.clone(),
            pending,
            base: self.use_path.clone(),
            listing: Vec::new().into_iter(),
            require_separator: self.is_root() || self.is_coupler(),
        }
    }

    /// Yields the attached sensors, searching the default coupler branches.
    pub fn children(&self) -> Sensors {
        self.list_children(&DEFAULT_BRANCHES)
    }

    /// Collects [`Sensor::children`].
    pub fn sensor_list(&self) -> Result<Vec<Sensor>> {
        self.children().collect()
    }

    /// Yields the attached sensors whose attributes match `fields`.
    ///
    /// A field with `Some(value)` matches when the attribute reads back equal
    /// to `value`; a field with `None` matches when the attribute exists.
    /// With `match_all` every field must match, otherwise any one suffices.
    pub fn find<N, I>(&self, fields: I, match_all: bool) -> Find
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Option<Value>)>,
    {
        Find {
            children: self.children(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
            match_all,
        }
    }
}

impl PartialEq for Sensor {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Sensor {}

impl Hash for Sensor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} - {}", self.connection, self.use_path, self.node_type)
    }
}

impl fmt::Debug for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("path", &self.use_path)
            .field("server", &self.connection.config().host)
            .field("port", &self.connection.config().port)
            .finish()
    }
}

/// Entry names of one directory listing.
#[derive(Debug)]
pub struct Entries {
    listing: std::vec::IntoIter<String>,
    base: String,
    root: bool,
}

impl Entries {
    fn new(listing: Vec<String>, base: &str, root: bool) -> Self {
        Self {
            listing: listing.into_iter(),
            base: base.to_string(),
            root,
        }
    }
}

impl Iterator for Entries {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let entry = self.listing.next()?;
            if !self.root {
                return Some(last_segment(&entry).to_string());
            }
            let relative = entry
                .strip_prefix(self.base.as_str())
                .unwrap_or(&entry)
                .trim_matches('/');
            if !relative.is_empty() && !relative.contains('/') {
                return Some(relative.to_string());
            }
        }
    }
}

/// Sensors attached below a node, resolved one at a time.
pub struct Sensors {
    connection: Connection,
    pending: VecDeque<String>,
    base: String,
    listing: std::vec::IntoIter<String>,
    require_separator: bool,
}

impl Sensors {
    /// Resolves one listed entry. `Ok(None)` means the entry is not a sensor.
    fn resolve_entry(&self, entry: &str) -> Result<Option<Sensor>> {
        let path = join_path(&self.base, entry);
        let resolved = read_type(&self.connection, &join_path(&path, "type")).and_then(
            |node_type| Sensor::resolve(&path, self.connection.clone(), Some(node_type)),
        );
        match resolved {
            Ok(sensor) => Ok(Some(sensor)),
            Err(e) if e.is_unknown_sensor() => {
                log::debug!("skipping '{}': no type", path);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl Iterator for Sensors {
    type Item = Result<Sensor>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.listing.next() {
                if self.require_separator && !entry.contains('/') {
                    continue;
                }
                match self.resolve_entry(&entry) {
                    Ok(Some(sensor)) => return Some(Ok(sensor)),
                    Ok(None) => continue,
                    Err(e) => return Some(Err(e)),
                }
            }

            let dir = self.pending.pop_front()?;
            match self.connection.dir(&dir) {
                Ok(listing) => {
                    self.listing = listing.into_iter();
                    self.base = dir;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl fmt::Debug for Sensors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensors")
            .field("base", &self.base)
            .field("pending", &self.pending)
            .finish()
    }
}

/// Attached sensors filtered by attribute predicates.
#[derive(Debug)]
pub struct Find {
    children: Sensors,
    fields: Vec<(String, Option<Value>)>,
    match_all: bool,
}

impl Find {
    fn matches(&self, sensor: &Sensor) -> Result<usize> {
        let mut matched = 0;
        for (name, expected) in &self.fields {
            if !sensor.has_attribute(name) {
                continue;
            }
            let Some(expected) = expected else {
                matched += 1;
                continue;
            };
            match sensor.get_attribute(name) {
                Ok(actual) if actual == *expected => matched += 1,
                Ok(_) => {}
                Err(e) if e.is_unknown_attribute() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(matched)
    }
}

impl Iterator for Find {
    type Item = Result<Sensor>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let sensor = match self.children.next()? {
                Ok(sensor) => sensor,
                Err(e) => return Some(Err(e)),
            };
            let matched = match self.matches(&sensor) {
                Ok(matched) => matched,
                Err(e) => return Some(Err(e)),
            };
            let hit = if self.match_all {
                matched == self.fields.len()
            } else {
                matched > 0
            };
            if hit {
                return Some(Ok(sensor));
            }
        }
    }
}
