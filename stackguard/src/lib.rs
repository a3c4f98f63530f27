//! Guarded function calls for stackguard.
//!
//! A [`Guard`] wraps a function invocation so that faults are observed but
//! never altered: on a fault the guard captures the call chain as a bounded
//! [`Stacktrace`], resolves the culprit frame, hands an [`Event`] to the
//! injected [`Sink`], and lets the original fault propagate to the caller
//! unchanged. Callers see exactly what they would see without
//! instrumentation, plus an out-of-band diagnostic event.
//!
//! Sinks are injected explicitly at construction time; there is no
//! process-global client registry.
//!
//! # Example
//!
//! ```
//! use stackguard::test::TestSink;
//! use stackguard::Guard;
//!
//! let sink = TestSink::new();
//! let guard = Guard::new(sink.clone());
//!
//! let result: Result<u32, String> = guard.call("demo.checked_div", || {
//!     Err("division by zero".to_string())
//! });
//!
//! assert_eq!(result, Err("division by zero".to_string()));
//! let events = sink.fetch_and_clear_events();
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].logger, "demo.checked_div");
//! ```

#![warn(missing_docs)]

mod config;
mod encoder;
mod guard;
mod macros;
mod sink;


pub use crate::config::{CaptureOptions, ConfigError};
pub use crate::encoder::encode_stacktrace;
pub use crate::guard::{message_from_unwind_payload, Guard};
pub use crate::sink::{Sink, SinkError};

pub use stackguard_backtrace::{
    capture, native_traceback, resolve_culprit, Limits, Local, NativeInspector, RawFrame,
    Traceback, TracebackInspector,
};
pub use stackguard_types::{Event, Frame, Severity, StackFields, Stacktrace};
