//! Nagios-style threshold checks against a single sensor field.
//!
//! ```no_run
//! use ownet::{check_sensor, ConnectionConfig, Thresholds};
//!
//! let config = ConnectionConfig::new("localhost");
//! let thresholds = Thresholds::new(28.0, 35.0);
//! let report = check_sensor(&config, "/10.67C6697351FF", "temperature", thresholds);
//! println!("{}", report);
//! std::process::exit(report.status.exit_code());
//! ```

use std::fmt;

use crate::connection::ConnectionConfig;
use crate::error::Result;
use crate::sensor::Sensor;
use crate::value::Value;

/// Plugin status, ordered by severity except for `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Below the warning level.
    Ok,
    /// At or above the warning level.
    Warning,
    /// At or above the critical level.
    Critical,
    /// The value could not be obtained.
    Unknown,
}

impl Status {
    /// Returns the process exit code Nagios expects for this status.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }

    /// Returns the upper-case status label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Warning and critical levels for a numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Values at or above this level are a warning.
    pub warning: f64,
    /// Values at or above this level are critical.
    pub critical: f64,
}

impl Thresholds {
    /// Creates thresholds from the two levels.
    pub fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    /// Classifies `value`. The critical level is tested first.
    pub fn evaluate(&self, value: f64) -> Status {
        if value >= self.critical {
            Status::Critical
        } else if value >= self.warning {
            Status::Warning
        } else {
            Status::Ok
        }
    }
}

/// Outcome of [`check_sensor`], rendered as a single plugin output line.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    /// Evaluated status.
    pub status: Status,
    /// Sensor path that was checked.
    pub path: String,
    /// Field that was checked.
    pub field: String,
    /// The value read, if any.
    pub value: Option<Value>,
    /// Why no status could be evaluated.
    pub message: Option<String>,
}

impl CheckReport {
    fn unknown(path: &str, field: &str, message: String) -> Self {
        Self {
            status: Status::Unknown,
            path: path.to_string(),
            field: field.to_string(),
            value: None,
            message: Some(message),
        }
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, &self.message) {
            (Some(value), None) => write!(
                f,
                "OW {} - {} {}: {}| {}/{}={}",
                self.status, self.path, self.field, value, self.path, self.field, value
            ),
            (_, Some(message)) => write!(f, "OW {} - {}", self.status, message),
            (None, None) => write!(f, "OW {} - {} {}", self.status, self.path, self.field),
        }
    }
}

fn read_field(config: &ConnectionConfig, path: &str, field: &str) -> Result<Option<Value>> {
    let sensor = Sensor::with_config(path, config.clone())?;
    if !sensor.has_attribute(field) {
        return Ok(None);
    }
    sensor.get_attribute(field).map(Some)
}

/// Reads `field` of the sensor at `path` and evaluates it against `thresholds`.
///
/// Never fails: protocol errors, unknown sensors or fields and non-numeric
/// values all produce a [`Status::Unknown`] report describing the problem.
pub fn check_sensor(
    config: &ConnectionConfig,
    path: &str,
    field: &str,
    thresholds: Thresholds,
) -> CheckReport {
    let value = match read_field(config, path, field) {
        Ok(Some(value)) => value,
        Ok(None) => return CheckReport::unknown(path, field, format!("unknown field: {}", field)),
        Err(e) => {
            log::debug!("check of {} {} failed: {}", path, field, e);
            return CheckReport::unknown(path, field, e.to_string());
        }
    };

    let Some(number) = value.as_f64() else {
        return CheckReport::unknown(
            path,
            field,
            format!("non-numeric value for {}: {}", field, value),
        );
    };

    CheckReport {
        status: thresholds.evaluate(number),
        path: path.to_string(),
        field: field.to_string(),
        value: Some(value),
        message: None,
    }
}
