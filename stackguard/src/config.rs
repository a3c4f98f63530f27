use serde_json::Value;
use thiserror::Error;

use stackguard_backtrace::Limits;
use stackguard_types::{Map, Severity};

/// An error surfaced when validating a configuration map.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration contained keys no option recognizes.
    #[error("unexpected arguments: {}", .0.join(", "))]
    UnexpectedArguments(Vec<String>),
    /// A recognized key carried a value of the wrong type.
    #[error("invalid value for `{key}`: {value}")]
    InvalidValue {
        /// The offending configuration key.
        key: String,
        /// The rejected value.
        value: Value,
    },
}

/// Options controlling capture and reporting of a [`Guard`](crate::Guard).
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    /// Maximum length of a string-like local before truncation.
    pub str_length: usize,
    /// Maximum element count of a container-like local before truncation.
    pub list_length: usize,
    /// Maximum number of retained frames, unbounded when `None`.
    pub max_frames: Option<usize>,
    /// Severity assigned to events reported for `Err` results.
    pub severity: Severity,
    /// Enables diagnostic logging of the guard itself to stderr.
    pub debug: bool,
}

impl Default for CaptureOptions {
    fn default() -> CaptureOptions {
        CaptureOptions {
            str_length: 200,
            list_length: 50,
            max_frames: None,
            severity: Severity::Error,
            debug: false,
        }
    }
}

impl CaptureOptions {
    /// Builds options from a configuration map.
    ///
    /// Recognized keys are `str_length`, `list_length`, `max_frames`,
    /// `severity` and `debug`. Unrecognized keys fail immediately with
    /// [`ConfigError::UnexpectedArguments`] rather than being deferred to
    /// first use.
    pub fn from_config(mut config: Map<String, Value>) -> Result<CaptureOptions, ConfigError> {
        let mut options = CaptureOptions::default();

        if let Some(value) = config.remove("str_length") {
            options.str_length = usize_value("str_length", value)?;
        }
        if let Some(value) = config.remove("list_length") {
            options.list_length = usize_value("list_length", value)?;
        }
        if let Some(value) = config.remove("max_frames") {
            options.max_frames = match value {
                Value::Null => None,
                other => Some(usize_value("max_frames", other)?),
            };
        }
        if let Some(value) = config.remove("severity") {
            let parsed = value.as_str().and_then(|s| s.parse::<Severity>().ok());
            options.severity = parsed.ok_or(ConfigError::InvalidValue {
                key: "severity".into(),
                value,
            })?;
        }
        if let Some(value) = config.remove("debug") {
            options.debug = value.as_bool().ok_or(ConfigError::InvalidValue {
                key: "debug".into(),
                value,
            })?;
        }

        if !config.is_empty() {
            return Err(ConfigError::UnexpectedArguments(
                config.keys().cloned().collect(),
            ));
        }

        Ok(options)
    }

    /// Returns the capture limits derived from these options.
    pub fn limits(&self) -> Limits {
        Limits {
            max_string_length: self.str_length,
            max_container_length: self.list_length,
            max_frames: self.max_frames,
        }
    }
}

fn usize_value(key: &str, value: Value) -> Result<usize, ConfigError> {
    value
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.into(),
            value,
        })
}
