//! The stackguard event protocol.
//!
//! Most constructs map directly to the message shape consumed by event sinks.
//! Everything here is immutable once constructed and fully JSON-serializable;
//! the capture layer guarantees that no raw object references or cycles ever
//! reach these types.

use std::borrow::Cow;
use std::fmt;
use std::str;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::ts_seconds_float;

/// An arbitrary (JSON) value.
pub mod value {
    pub use serde_json::value::{from_value, to_value, Map, Number, Value};
}

/// The internally used arbitrary data map type.
pub mod map {
    pub use std::collections::btree_map::{BTreeMap as Map, *};
}

/// An arbitrary (JSON) value.
pub use self::value::Value;

/// The internally used map type.
pub use self::map::Map;

/// Represents a single captured stack frame.
///
/// A frame is a snapshot of one activation record at the moment a fault
/// passed through it. The `vars` map only ever holds shortened values, so a
/// frame is always safe to serialize regardless of what the frame's locals
/// looked like at runtime.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct Frame {
    /// The name of the function executing in this frame.
    pub function: String,
    /// The best-effort containing module, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// The source filename, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// The source line number, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u64>,
    /// Shortened local variables bound in this frame.
    ///
    /// Locals are best-effort: platforms that cannot enumerate locals leave
    /// this empty rather than failing the capture.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub vars: Map<String, Value>,
}

impl Frame {
    /// Returns the qualified name of the frame's function.
    ///
    /// This is `module.function` when a non-empty module is known and the
    /// bare function name otherwise.
    pub fn qualified_name(&self) -> String {
        match self.module.as_deref() {
            Some(module) if !module.is_empty() => format!("{}.{}", module, self.function),
            _ => self.function.clone(),
        }
    }
}

/// Represents a captured stacktrace.
///
/// Frames are ordered from the outermost call site to the innermost frame,
/// the one where the fault was raised.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Stacktrace {
    /// The list of frames, outermost first.
    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl Stacktrace {
    /// Creates a stacktrace from a list of frames ordered outermost first.
    pub fn from_frames(frames: Vec<Frame>) -> Stacktrace {
        Stacktrace { frames }
    }

    /// Checks whether the stacktrace contains any frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the number of captured frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

/// An error used when parsing `Severity`.
#[derive(Debug, Error)]
#[error("invalid severity")]
pub struct ParseSeverityError;

/// Represents the severity of an event.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Very spammy debug information.
    Debug,
    /// Informational messages.
    Info,
    /// A warning.
    Warning,
    /// An error.
    Error,
    /// A critical event, usually one that caused an unwind.
    Critical,
}

impl Default for Severity {
    fn default() -> Severity {
        Severity::Error
    }
}

impl str::FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(string: &str) -> Result<Severity, Self::Err> {
        Ok(match string {
            "debug" => Severity::Debug,
            "info" => Severity::Info,
            "warning" => Severity::Warning,
            "error" => Severity::Error,
            "critical" => Severity::Critical,
            _ => return Err(ParseSeverityError),
        })
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Severity::Debug => write!(f, "debug"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// The structured fields of a stack-capture event.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct StackFields {
    /// The qualified name of the frame judged responsible for the fault.
    pub culprit: String,
    /// The captured frames, outermost first.
    pub frames: Vec<Frame>,
    /// Additional free-form fields attached by the reporter.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The event type tag of plain stack-capture events.
pub const EVENT_TYPE_STACKTRACE: &str = "stacktrace";

/// The event type tag of events carrying an encoded payload.
pub const EVENT_TYPE_SENTRY: &str = "sentry";

/// Represents one diagnostic event handed to a sink.
///
/// Events are transient snapshots. They are created fresh for every captured
/// fault, handed to the sink, and have no persisted identity.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    /// The event type tag.
    #[serde(rename = "type")]
    pub ty: Cow<'static, str>,
    /// The logger that reported the event, conventionally the qualified
    /// name of the guarded function.
    pub logger: String,
    /// The severity of the event.
    pub severity: Severity,
    /// The time at which the event was created.
    #[serde(with = "ts_seconds_float")]
    pub timestamp: SystemTime,
    /// The structured stack-capture fields.
    pub fields: StackFields,
    /// An optional pre-encoded payload, used by the `"sentry"` flavor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl Default for Event {
    fn default() -> Event {
        Event {
            ty: Cow::Borrowed(EVENT_TYPE_STACKTRACE),
            logger: String::new(),
            severity: Severity::default(),
            timestamp: SystemTime::now(),
            fields: StackFields::default(),
            payload: None,
        }
    }
}

impl Event {
    /// Creates a plain stack-capture event.
    pub fn stacktrace(logger: impl Into<String>, severity: Severity, fields: StackFields) -> Event {
        Event {
            ty: Cow::Borrowed(EVENT_TYPE_STACKTRACE),
            logger: logger.into(),
            severity,
            timestamp: SystemTime::now(),
            fields,
            payload: None,
        }
    }

    /// Creates an event carrying a pre-encoded payload.
    pub fn with_payload(
        logger: impl Into<String>,
        severity: Severity,
        fields: StackFields,
        payload: String,
    ) -> Event {
        Event {
            ty: Cow::Borrowed(EVENT_TYPE_SENTRY),
            logger: logger.into(),
            severity,
            timestamp: SystemTime::now(),
            fields,
            payload: Some(payload),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Event(ty: {}, logger: {}", self.ty, self.logger)?;
        if !self.fields.culprit.is_empty() {
            write!(f, ", culprit: {}", self.fields.culprit)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_frame_wire_shape() {
        let frame = Frame {
            function: "exception_call2".into(),
            module: Some("demo".into()),
            filename: Some("demo.rs".into()),
            lineno: Some(12),
            vars: {
                let mut vars = Map::new();
                vars.insert("a".into(), json!(5));
                vars
            },
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "function": "exception_call2",
                "module": "demo",
                "filename": "demo.rs",
                "lineno": 12,
                "vars": {"a": 5},
            })
        );
    }

    #[test]
    fn test_frame_omits_empty_fields() {
        let frame = Frame {
            function: "main".into(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"function": "main"})
        );
    }

    #[test]
    fn test_qualified_name() {
        let mut frame = Frame {
            function: "run".into(),
            module: Some("app".into()),
            ..Default::default()
        };
        assert_eq!(frame.qualified_name(), "app.run");
        frame.module = Some(String::new());
        assert_eq!(frame.qualified_name(), "run");
        frame.module = None;
        assert_eq!(frame.qualified_name(), "run");
    }

    #[test]
    fn test_severity_parse_and_display() {
        for severity in [
            Severity::Debug,
            Severity::Info,
            Severity::Warning,
            Severity::Error,
            Severity::Critical,
        ] {
            assert_eq!(severity.to_string().parse::<Severity>().unwrap(), severity);
        }
        assert!("fatal".parse::<Severity>().is_err());
        assert_eq!(Severity::default(), Severity::Error);
    }

    #[test]
    fn test_event_wire_shape() {
        let mut event = Event::stacktrace(
            "demo.exception_call1",
            Severity::Error,
            StackFields {
                culprit: "demo.exception_call2".into(),
                frames: vec![Frame {
                    function: "exception_call2".into(),
                    ..Default::default()
                }],
                extra: Map::new(),
            },
        );
        event.timestamp = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(100);

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "stacktrace",
                "logger": "demo.exception_call1",
                "severity": "error",
                "timestamp": 100,
                "fields": {
                    "culprit": "demo.exception_call2",
                    "frames": [{"function": "exception_call2"}],
                },
            })
        );
    }

    #[test]
    fn test_event_roundtrip() {
        let mut event = Event::with_payload(
            "logger",
            Severity::Critical,
            StackFields::default(),
            "{}".into(),
        );
        event.timestamp = SystemTime::UNIX_EPOCH + std::time::Duration::from_millis(1500);
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.ty, EVENT_TYPE_SENTRY);
    }

    #[test]
    fn test_extra_fields_flatten() {
        let mut fields = StackFields::default();
        fields.extra.insert("msg".into(), json!("boom"));
        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(value["msg"], json!("boom"));
        assert_eq!(value["culprit"], json!(""));
    }
}
