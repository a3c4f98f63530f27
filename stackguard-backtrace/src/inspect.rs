use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use backtrace::Backtrace;

use crate::utils::{filename, parse_module_name, strip_symbol};

/// A snapshot of one runtime value bound in a captured frame.
///
/// Containers are reference counted so that a snapshot can alias, and even
/// cycle, the way live runtime state does. The shortening transform resolves
/// aliases and cycles by container identity; a `Local` itself is never
/// serialized directly.
#[derive(Clone)]
pub enum Local {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    Uint(u64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(String),
    /// A byte string, decoded lossily when shortened.
    Bytes(Vec<u8>),
    /// A sequence of values.
    Seq(Rc<RefCell<Vec<Local>>>),
    /// A string-keyed mapping of values.
    Map(Rc<RefCell<BTreeMap<String, Local>>>),
    /// An arbitrary value rendered through its `Display` impl on demand.
    ///
    /// Rendering happens inside the shortening pass and is allowed to panic;
    /// a panicking conversion degrades to a placeholder string.
    Repr(Rc<dyn fmt::Display>),
}

impl Local {
    /// Creates a sequence snapshot from a list of values.
    pub fn seq(items: Vec<Local>) -> Local {
        Local::Seq(Rc::new(RefCell::new(items)))
    }

    /// Creates a mapping snapshot from an iterator of entries.
    pub fn map<I>(entries: I) -> Local
    where
        I: IntoIterator<Item = (String, Local)>,
    {
        Local::Map(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    /// Creates a deferred-display snapshot of an arbitrary value.
    pub fn repr<T: fmt::Display + 'static>(value: T) -> Local {
        Local::Repr(Rc::new(value))
    }
}

impl fmt::Debug for Local {
    // Conservative by hand: containers may be cyclic, so a derived impl
    // could recurse forever.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Local::Null => write!(f, "Null"),
            Local::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Local::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Local::Uint(v) => f.debug_tuple("Uint").field(v).finish(),
            Local::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Local::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Local::Bytes(v) => write!(f, "Bytes({} bytes)", v.len()),
            Local::Seq(v) => write!(f, "Seq({} items)", v.borrow().len()),
            Local::Map(v) => write!(f, "Map({} entries)", v.borrow().len()),
            Local::Repr(_) => write!(f, "Repr(..)"),
        }
    }
}

impl From<bool> for Local {
    fn from(value: bool) -> Local {
        Local::Bool(value)
    }
}

impl From<i64> for Local {
    fn from(value: i64) -> Local {
        Local::Int(value)
    }
}

impl From<u64> for Local {
    fn from(value: u64) -> Local {
        Local::Uint(value)
    }
}

impl From<f64> for Local {
    fn from(value: f64) -> Local {
        Local::Float(value)
    }
}

impl From<&str> for Local {
    fn from(value: &str) -> Local {
        Local::Str(value.to_owned())
    }
}

impl From<String> for Local {
    fn from(value: String) -> Local {
        Local::Str(value)
    }
}

/// One raw activation record as produced by a [`TracebackInspector`].
#[derive(Debug, Clone, Default)]
pub struct RawFrame {
    /// The name of the function executing in this frame.
    pub function: String,
    /// The best-effort containing module.
    pub module: Option<String>,
    /// The source filename, if known.
    pub filename: Option<String>,
    /// The source line number, if known.
    pub lineno: Option<u64>,
    /// The local variables bound in this frame, in declaration order.
    pub locals: Vec<(String, Local)>,
}

impl RawFrame {
    /// Creates a raw frame with just a function name.
    pub fn new(function: impl Into<String>) -> RawFrame {
        RawFrame {
            function: function.into(),
            ..Default::default()
        }
    }
}

/// Enumerates the frames of a propagating fault.
///
/// Implementations walk whatever introspection surface the platform offers
/// and yield frames ordered from the outermost call site to the innermost
/// frame. Locals are best-effort; an inspector that cannot enumerate them
/// leaves them empty.
pub trait TracebackInspector {
    /// Returns the frames of the current fault, outermost first.
    fn enumerate_frames(&self) -> Vec<RawFrame>;
}

/// A handle over one fault's captured call chain.
///
/// The handle is only meaningful within the handler scope that observed the
/// fault and must be consumed there: it is deliberately `!Send`, so it
/// cannot be parked on another thread or retained across an `await` that
/// moves the task.
#[derive(Debug)]
pub struct Traceback {
    frames: Vec<RawFrame>,
    _handler_scope: PhantomData<*const ()>,
}

impl Traceback {
    /// Creates an empty traceback, the "no active fault" case.
    pub fn empty() -> Traceback {
        Traceback::from_frames(Vec::new())
    }

    /// Creates a traceback from raw frames ordered outermost first.
    pub fn from_frames(frames: Vec<RawFrame>) -> Traceback {
        Traceback {
            frames,
            _handler_scope: PhantomData,
        }
    }

    /// Snapshots the frames of the given inspector.
    pub fn from_inspector(inspector: &dyn TracebackInspector) -> Traceback {
        Traceback::from_frames(inspector.enumerate_frames())
    }

    /// Returns the raw frames, outermost first.
    pub fn frames(&self) -> &[RawFrame] {
        &self.frames
    }

    /// Checks whether any frames were captured.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// A [`TracebackInspector`] backed by the `backtrace` crate.
///
/// This inspector resolves function names and source locations from the
/// stack of the thread it was created on. Local variables are not
/// recoverable from a compiled stack, so `locals` stays empty; this is a
/// platform capability gap, not a capture failure.
pub struct NativeInspector {
    backtrace: Backtrace,
}

impl NativeInspector {
    /// Captures and symbolicates the current thread's stack.
    pub fn new() -> NativeInspector {
        NativeInspector {
            backtrace: Backtrace::new(),
        }
    }
}

impl Default for NativeInspector {
    fn default() -> NativeInspector {
        NativeInspector::new()
    }
}

impl fmt::Debug for NativeInspector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeInspector").finish_non_exhaustive()
    }
}

impl TracebackInspector for NativeInspector {
    fn enumerate_frames(&self) -> Vec<RawFrame> {
        let mut frames: Vec<RawFrame> = self
            .backtrace
            .frames()
            .iter()
            .flat_map(|frame| {
                frame.symbols().iter().map(move |sym| {
                    let abs_path = sym.filename().map(|p| p.to_string_lossy().to_string());
                    let file = abs_path.as_deref().map(|p| filename(p).to_string());
                    let symbol = sym
                        .name()
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "<unknown>".into());
                    let function = strip_symbol(&symbol).into_owned();
                    let module = parse_module_name(&function);
                    RawFrame {
                        function,
                        module,
                        filename: file,
                        lineno: sym.lineno().map(u64::from),
                        locals: Vec::new(),
                    }
                })
            })
            .collect();
        // the backtrace crate yields the innermost frame first
        frames.reverse();
        frames
    }
}

/// Captures the current thread's stack as a traceback.
pub fn native_traceback() -> Traceback {
    Traceback::from_inspector(&NativeInspector::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traceback_from_frames() {
        let tb = Traceback::from_frames(vec![
            RawFrame::new("outer"),
            RawFrame::new("inner"),
        ]);
        assert_eq!(tb.frames().len(), 2);
        assert_eq!(tb.frames()[0].function, "outer");
        assert!(!tb.is_empty());
        assert!(Traceback::empty().is_empty());
    }

    #[test]
    fn test_native_traceback_has_frames() {
        let tb = native_traceback();
        assert!(!tb.is_empty());
        // locals are not recoverable from a compiled stack
        assert!(tb.frames().iter().all(|frame| frame.locals.is_empty()));
    }

    #[test]
    fn test_local_debug_is_cycle_safe() {
        let seq = Rc::new(RefCell::new(vec![Local::Int(1)]));
        let cyclic = Local::Seq(seq.clone());
        seq.borrow_mut().push(cyclic.clone());
        assert_eq!(format!("{cyclic:?}"), "Seq(2 items)");
    }
}
