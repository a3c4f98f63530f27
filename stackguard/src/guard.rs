use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::{Arc, Once};

use serde_json::Value;

use stackguard_backtrace::{capture, native_traceback, resolve_culprit, Traceback};
use stackguard_types::{Event, Severity, StackFields};

use crate::config::CaptureOptions;
use crate::encoder::encode_stacktrace;
use crate::macros::guard_debug;
use crate::sink::Sink;

type TracebackSource = dyn Fn() -> Traceback + Send + Sync;

thread_local! {
    // stack snapshot taken by the panic hook, consumed by `call_unwind`
    static PANIC_TRACEBACK: RefCell<Option<Traceback>> = const { RefCell::new(None) };
}

static INIT: Once = Once::new();

/// Installs a panic hook that snapshots the stack at the panic site.
///
/// The frames of a panicking function are gone by the time `catch_unwind`
/// observes the unwind; only the hook still sees them. The snapshot is
/// stashed per thread and the previously registered hook runs afterwards,
/// so panic output is unaffected.
fn install_panic_traceback_hook() {
    INIT.call_once(|| {
        let next = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            PANIC_TRACEBACK.with(|slot| {
                *slot.borrow_mut() = Some(native_traceback());
            });
            next(info);
        }));
    });
}

fn take_panic_traceback() -> Option<Traceback> {
    PANIC_TRACEBACK.with(|slot| slot.borrow_mut().take())
}

/// Wraps function invocations so that faults are captured and reported.
///
/// A guard is purely observational: a guarded function's return value and
/// its faults pass through unchanged, and a fault additionally produces one
/// event on the injected sink. The sink is handed in at construction time,
/// never looked up ambiently.
///
/// Independent guarded calls share no mutable state; a `Guard` can be
/// shared freely across threads as long as its sink allows it.
pub struct Guard {
    sink: Arc<dyn Sink>,
    options: CaptureOptions,
    traceback_source: Option<Arc<TracebackSource>>,
    payload_encoding: bool,
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("options", &self.options)
            .field("payload_encoding", &self.payload_encoding)
            .finish_non_exhaustive()
    }
}

impl Guard {
    /// Creates a guard reporting to the given sink with default options.
    pub fn new(sink: Arc<dyn Sink>) -> Guard {
        Guard::with_options(sink, CaptureOptions::default())
    }

    /// Creates a guard reporting to the given sink.
    pub fn with_options(sink: Arc<dyn Sink>, options: CaptureOptions) -> Guard {
        Guard {
            sink,
            options,
            traceback_source: None,
            payload_encoding: false,
        }
    }

    /// Overrides where tracebacks come from.
    ///
    /// By default a fault is described by the native inspector, which can
    /// only recover function names and source locations. Instrumented
    /// runtimes (and tests) install a source here to supply frames with
    /// locals. The source runs inside the handler scope of the fault.
    #[must_use]
    pub fn traceback_source<F>(mut self, source: F) -> Guard
    where
        F: Fn() -> Traceback + Send + Sync + 'static,
    {
        self.traceback_source = Some(Arc::new(source));
        self
    }

    /// Enables the legacy payload flavor.
    ///
    /// Events then carry the `"sentry"` type tag and a pre-encoded JSON
    /// payload of the captured stacktrace next to the structured fields.
    #[must_use]
    pub fn payload_encoding(mut self, enabled: bool) -> Guard {
        self.payload_encoding = enabled;
        self
    }

    /// Returns the options of this guard.
    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    /// Invokes `f`, reporting an event if it returns `Err`.
    ///
    /// On success the value passes through untouched. On failure the error
    /// is reported under `logger` (conventionally the qualified name of the
    /// guarded function) and then returned unchanged; handling the fault
    /// remains the caller's responsibility.
    pub fn call<T, E, F>(&self, logger: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display,
    {
        match f() {
            Ok(value) => Ok(value),
            Err(error) => {
                self.report(logger, self.options.severity, Some(error.to_string()));
                Err(error)
            }
        }
    }

    /// Invokes `f`, reporting an event if it unwinds.
    ///
    /// A panic is reported with [`Severity::Critical`] and then resumed
    /// with its original payload, so callers observe the exact same unwind
    /// they would without the guard.
    ///
    /// The first guarded call installs a process-wide panic hook that
    /// snapshots the stack at the panic site, before any frames unwind;
    /// the reported frames therefore include the panicking function
    /// itself, not the guard's catch site.
    pub fn call_unwind<T, F>(&self, logger: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        install_panic_traceback_hook();
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => value,
            Err(payload) => {
                let message = message_from_unwind_payload(payload.as_ref()).to_owned();
                let traceback = take_panic_traceback();
                self.report_with(logger, Severity::Critical, Some(message), traceback);
                resume_unwind(payload)
            }
        }
    }

    fn report(&self, logger: &str, severity: Severity, message: Option<String>) {
        self.report_with(logger, severity, message, None)
    }

    /// Captures the current fault and hands one event to the sink.
    ///
    /// Capture runs entirely within the handler scope; the traceback handle
    /// is consumed before this returns. Sink failures are logged and
    /// suppressed: the guarded function's own fault always takes precedence
    /// over delivery problems.
    fn report_with(
        &self,
        logger: &str,
        severity: Severity,
        message: Option<String>,
        traceback: Option<Traceback>,
    ) {
        let traceback = match &self.traceback_source {
            Some(source) => source(),
            None => traceback.unwrap_or_else(native_traceback),
        };
        let stacktrace = capture(&traceback, &self.options.limits());
        let culprit = resolve_culprit(&stacktrace.frames);
        guard_debug!(
            self.options,
            "[Guard] captured {} frames for `{}`, culprit: {:?}",
            stacktrace.len(),
            logger,
            culprit
        );

        let mut fields = StackFields {
            culprit,
            frames: stacktrace.frames,
            extra: Default::default(),
        };
        if let Some(message) = message {
            fields.extra.insert("msg".into(), Value::String(message));
        }

        let event = if self.payload_encoding {
            match encode_stacktrace(&fields) {
                Ok(payload) => Event::with_payload(logger, severity, fields, payload),
                Err(error) => {
                    guard_debug!(self.options, "[Guard] payload encoding failed: {}", error);
                    Event::stacktrace(logger, severity, fields)
                }
            }
        } else {
            Event::stacktrace(logger, severity, fields)
        };

        if let Err(error) = self.sink.send_event(event) {
            guard_debug!(self.options, "[Guard] event delivery failed: {}", error);
        }
    }
}

/// Extracts the message of an unwind payload.
pub fn message_from_unwind_payload(payload: &(dyn Any + Send)) -> &str {
    match payload.downcast_ref::<&'static str>() {
        Some(message) => message,
        None => match payload.downcast_ref::<String>() {
            Some(message) => &message[..],
            None => "Box<Any>",
        },
    }
}
