//! This crate provides common types for working with the stackguard event
//! protocol: the frame and stacktrace records produced by stack capture, the
//! severity scale, and the event record handed to sinks.
//!
//! The types are all plain serde-serializable data with no capture logic of
//! their own. Capturing lives in `stackguard-backtrace`, the guarded-call
//! wrapper in `stackguard`.

#![warn(missing_docs)]

mod protocol;

pub mod utils;

pub use crate::protocol::*;
