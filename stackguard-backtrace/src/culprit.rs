use stackguard_types::Frame;

use crate::utils::function_starts_with;

const INTERNAL_FRAME_PREFIXES: &[&str] = &[
    // the guard and capture machinery itself
    "stackguard::",
    "stackguard_backtrace::",
    "stackguard_types::",
    // standard library and unwind plumbing
    "std::",
    "core::",
    "alloc::",
    "backtrace::",
    "__rust_",
    "__rustc::",
    "___rust_",
    "_rust_begin_unwind",
    "rust_begin_unwind",
    "rust_panic",
];

/// Resolves the culprit of a captured stacktrace.
///
/// The culprit is the qualified name of the innermost frame that is not
/// part of the guard or runtime machinery. The wrapper itself runs as a
/// frame on the stack when a fault is observed; without the exclusion it
/// would shadow the true origin on every call.
///
/// Resolution is best-effort diagnostic data and never fails: if every
/// frame is internal the innermost frame wins unconditionally, and an empty
/// stacktrace resolves to an empty string.
pub fn resolve_culprit(frames: &[Frame]) -> String {
    frames
        .iter()
        .rev()
        .find(|frame| !is_internal_frame(&frame.function))
        .or_else(|| frames.last())
        .map(Frame::qualified_name)
        .unwrap_or_default()
}

fn is_internal_frame(function: &str) -> bool {
    // symbols the resolver could not name carry no diagnostic value
    if function == "<unknown>" {
        return true;
    }
    INTERNAL_FRAME_PREFIXES
        .iter()
        .any(|prefix| function_starts_with(function, prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(function: &str, module: Option<&str>) -> Frame {
        Frame {
            function: function.into(),
            module: module.map(str::to_owned),
            ..Default::default()
        }
    }

    #[test]
    fn test_innermost_frame_wins() {
        let frames = vec![
            frame("f1", Some("demo")),
            frame("f2", Some("demo")),
            frame("f3", Some("demo")),
        ];
        assert_eq!(resolve_culprit(&frames), "demo.f3");
    }

    #[test]
    fn test_wrapper_frames_excluded() {
        let frames = vec![
            frame("demo::exception_call1", Some("demo")),
            frame("exception_call2", Some("demo")),
            frame("stackguard::guard::Guard::call", Some("stackguard")),
            frame("stackguard_backtrace::capture", Some("stackguard_backtrace")),
        ];
        assert_eq!(resolve_culprit(&frames), "demo.exception_call2");
    }

    #[test]
    fn test_trait_impl_wrapper_spelling_excluded() {
        let frames = vec![
            frame("run", Some("demo")),
            frame("_<stackguard..guard..Guard>::call::_{{closure}}", None),
        ];
        assert_eq!(resolve_culprit(&frames), "demo.run");
    }

    #[test]
    fn test_bare_function_without_module() {
        let frames = vec![frame("main", None)];
        assert_eq!(resolve_culprit(&frames), "main");
    }

    #[test]
    fn test_empty_module_treated_as_unknown() {
        let frames = vec![frame("main", Some(""))];
        assert_eq!(resolve_culprit(&frames), "main");
    }

    #[test]
    fn test_unwind_entry_points_excluded() {
        let frames = vec![
            frame("faulty_leaf", Some("demo")),
            frame("core::panicking::panic_fmt", None),
            frame("rust_begin_unwind", None),
            frame("<unknown>", None),
        ];
        assert_eq!(resolve_culprit(&frames), "demo.faulty_leaf");
    }

    #[test]
    fn test_all_internal_falls_back_to_innermost() {
        let frames = vec![
            frame("std::rt::lang_start", None),
            frame("core::ops::function::FnOnce::call_once", None),
        ];
        assert_eq!(
            resolve_culprit(&frames),
            "core::ops::function::FnOnce::call_once"
        );
    }

    #[test]
    fn test_empty_stack_resolves_to_empty_string() {
        assert_eq!(resolve_culprit(&[]), "");
    }
}
