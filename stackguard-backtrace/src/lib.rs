//! Stack capture for stackguard.
//!
//! This crate turns the call chain of a fault into a bounded,
//! JSON-serializable [`Stacktrace`] and resolves the "culprit", the frame
//! judged responsible for the fault.
//!
//! Capture is a pure, total transform: it never fails, never blocks and
//! touches nothing outside the [`Traceback`] handle it is given. Values that
//! cannot be represented safely degrade to placeholder markers instead of
//! producing a secondary failure.
//!
//! The inspection seam is the [`TracebackInspector`] trait. The native
//! inspector is backed by the `backtrace` crate and yields function names
//! and source locations; local variables are best-effort and left empty on
//! this platform, since a compiled program cannot cheaply enumerate the
//! locals of unwinding frames. Instrumented runtimes and tests can supply an
//! inspector that fills them in.

#![warn(missing_docs)]

mod capture;
mod culprit;
mod inspect;
mod shorten;
mod utils;

pub use crate::capture::{capture, Limits};
pub use crate::culprit::resolve_culprit;
pub use crate::inspect::{
    native_traceback, Local, NativeInspector, RawFrame, Traceback, TracebackInspector,
};
pub use crate::shorten::{shorten, CYCLE_MARKER, TRUNCATION_MARKER, UNREPRESENTABLE};
pub use stackguard_types::{Frame, Stacktrace};
