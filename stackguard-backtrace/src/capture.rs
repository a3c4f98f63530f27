use stackguard_types::{Frame, Stacktrace};

use crate::inspect::Traceback;
use crate::shorten::shorten;

/// Bounds applied while converting a traceback into a stacktrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum length of a string-like value before truncation.
    pub max_string_length: usize,
    /// Maximum element count of a container value before truncation.
    ///
    /// The bound applies recursively to values nested inside sequences and
    /// mappings.
    pub max_container_length: usize,
    /// Maximum number of retained frames, unbounded when `None`.
    ///
    /// When the traceback exceeds the bound the outermost frames are
    /// dropped first; the innermost frames are diagnostically the most
    /// valuable and are always retained.
    pub max_frames: Option<usize>,
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            max_string_length: 200,
            max_container_length: 50,
            max_frames: None,
        }
    }
}

/// Converts a traceback into a bounded, serializable stacktrace.
///
/// This is a pure transform over the traceback snapshot: it has no side
/// effects, never fails, and capturing the same handle twice yields
/// structurally identical output. An empty traceback (no active fault)
/// yields an empty stacktrace.
pub fn capture(traceback: &Traceback, limits: &Limits) -> Stacktrace {
    let mut frames: Vec<Frame> = traceback
        .frames()
        .iter()
        .map(|raw| Frame {
            function: raw.function.clone(),
            module: raw.module.clone(),
            filename: raw.filename.clone(),
            lineno: raw.lineno,
            vars: raw
                .locals
                .iter()
                .map(|(name, value)| (name.clone(), shorten(value, limits)))
                .collect(),
        })
        .collect();

    if let Some(max_frames) = limits.max_frames {
        if frames.len() > max_frames {
            frames.drain(..frames.len() - max_frames);
        }
    }

    Stacktrace::from_frames(frames)
}
