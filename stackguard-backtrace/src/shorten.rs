use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use serde_json::{Map as JsonMap, Number, Value};

use crate::capture::Limits;
use crate::inspect::Local;

/// Marker appended to truncated strings and containers.
pub const TRUNCATION_MARKER: &str = "...";

/// Marker substituted for a container revisited within one shortening pass.
pub const CYCLE_MARKER: &str = "<cycle>";

/// Placeholder substituted for values whose rendering failed.
pub const UNREPRESENTABLE: &str = "<unrepresentable>";

/// Bounds a captured value into a wire-ready JSON value.
///
/// Shortening is total: oversized strings and containers are truncated with
/// a trailing [`TRUNCATION_MARKER`], self-referential structures terminate
/// at a [`CYCLE_MARKER`], and values whose display panics degrade to
/// [`UNREPRESENTABLE`] instead of propagating a secondary failure.
pub fn shorten(local: &Local, limits: &Limits) -> Value {
    let mut seen = Vec::new();
    shorten_inner(local, limits, &mut seen)
}

fn shorten_inner(local: &Local, limits: &Limits, seen: &mut Vec<usize>) -> Value {
    match local {
        Local::Null => Value::Null,
        Local::Bool(value) => Value::Bool(*value),
        Local::Int(value) => Value::Number((*value).into()),
        Local::Uint(value) => Value::Number((*value).into()),
        Local::Float(value) => Number::from_f64(*value)
            .map(Value::Number)
            // JSON has no rendering for non-finite floats
            .unwrap_or_else(|| Value::String(value.to_string())),
        Local::Str(value) => Value::String(shorten_string(value, limits.max_string_length)),
        Local::Bytes(value) => Value::String(shorten_string(
            &String::from_utf8_lossy(value),
            limits.max_string_length,
        )),
        Local::Seq(seq) => {
            let identity = Rc::as_ptr(seq) as usize;
            if seen.contains(&identity) {
                return Value::String(CYCLE_MARKER.into());
            }
            seen.push(identity);
            let items = seq.borrow();
            let mut shortened: Vec<Value> = items
                .iter()
                .take(limits.max_container_length)
                .map(|item| shorten_inner(item, limits, seen))
                .collect();
            if items.len() > limits.max_container_length {
                shortened.push(Value::String(TRUNCATION_MARKER.into()));
            }
            seen.pop();
            Value::Array(shortened)
        }
        Local::Map(map) => {
            let identity = Rc::as_ptr(map) as usize;
            if seen.contains(&identity) {
                return Value::String(CYCLE_MARKER.into());
            }
            seen.push(identity);
            let entries = map.borrow();
            let mut shortened = JsonMap::new();
            for (key, value) in entries.iter().take(limits.max_container_length) {
                shortened.insert(key.clone(), shorten_inner(value, limits, seen));
            }
            if entries.len() > limits.max_container_length {
                shortened.insert(
                    TRUNCATION_MARKER.into(),
                    Value::String(TRUNCATION_MARKER.into()),
                );
            }
            seen.pop();
            Value::Object(shortened)
        }
        Local::Repr(repr) => {
            let repr = repr.clone();
            match catch_unwind(AssertUnwindSafe(move || repr.to_string())) {
                Ok(rendered) => {
                    Value::String(shorten_string(&rendered, limits.max_string_length))
                }
                Err(_) => Value::String(UNREPRESENTABLE.into()),
            }
        }
    }
}

fn shorten_string(s: &str, max_length: usize) -> String {
    if s.chars().count() <= max_length {
        return s.to_owned();
    }
    let mut shortened: String = s.chars().take(max_length).collect();
    shortened.push_str(TRUNCATION_MARKER);
    shortened
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::fmt;

    use serde_json::json;

    use super::*;

    fn limits(string: usize, container: usize) -> Limits {
        Limits {
            max_string_length: string,
            max_container_length: container,
            ..Default::default()
        }
    }

    #[test]
    fn test_scalars_pass_through() {
        let limits = Limits::default();
        assert_eq!(shorten(&Local::Null, &limits), Value::Null);
        assert_eq!(shorten(&Local::Bool(true), &limits), json!(true));
        assert_eq!(shorten(&Local::Int(-3), &limits), json!(-3));
        assert_eq!(shorten(&Local::Uint(7), &limits), json!(7));
        assert_eq!(shorten(&Local::Float(1.5), &limits), json!(1.5));
        assert_eq!(shorten(&Local::from("hi"), &limits), json!("hi"));
    }

    #[test]
    fn test_non_finite_float_degrades_to_string() {
        let limits = Limits::default();
        assert_eq!(shorten(&Local::Float(f64::NAN), &limits), json!("NaN"));
        assert_eq!(shorten(&Local::Float(f64::INFINITY), &limits), json!("inf"));
    }

    #[test]
    fn test_string_truncation_bound() {
        let limits = limits(10, 50);
        let value = shorten(&Local::from("x".repeat(500).as_str()), &limits);
        let shortened = value.as_str().unwrap();
        assert_eq!(shortened.len(), 10 + TRUNCATION_MARKER.len());
        assert!(shortened.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_short_string_untouched() {
        let limits = limits(10, 50);
        assert_eq!(shorten(&Local::from("short"), &limits), json!("short"));
    }

    #[test]
    fn test_string_truncation_is_char_aware() {
        let limits = limits(2, 50);
        let value = shorten(&Local::from("äöüß"), &limits);
        assert_eq!(value, json!(format!("äö{TRUNCATION_MARKER}")));
    }

    #[test]
    fn test_bytes_shortened_as_string() {
        let limits = limits(4, 50);
        let value = shorten(&Local::Bytes(b"hello world".to_vec()), &limits);
        assert_eq!(value, json!(format!("hell{TRUNCATION_MARKER}")));
    }

    #[test]
    fn test_sequence_truncation_exact_length() {
        let limits = limits(200, 5);
        let items = (0..20).map(Local::Int).collect();
        let value = shorten(&Local::seq(items), &limits);
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 5 + 1);
        assert_eq!(array.last().unwrap(), &json!(TRUNCATION_MARKER));
        assert_eq!(array[0], json!(0));
    }

    #[test]
    fn test_sequence_at_bound_untouched() {
        let limits = limits(200, 5);
        let items = (0..5).map(Local::Int).collect();
        let value = shorten(&Local::seq(items), &limits);
        assert_eq!(value.as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_map_entries_bounded() {
        let limits = limits(200, 2);
        let entries = (0..4).map(|i| (format!("k{i}"), Local::Int(i)));
        let value = shorten(&Local::map(entries), &limits);
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2 + 1);
        assert_eq!(object[TRUNCATION_MARKER], json!(TRUNCATION_MARKER));
    }

    #[test]
    fn test_nested_values_shortened_recursively() {
        let limits = limits(3, 2);
        let inner = Local::seq(vec![Local::from("abcdefg"), Local::Int(1), Local::Int(2)]);
        let value = shorten(
            &Local::map([("nested".to_string(), inner)]),
            &limits,
        );
        assert_eq!(
            value,
            json!({"nested": [format!("abc{TRUNCATION_MARKER}"), 1, TRUNCATION_MARKER]})
        );
    }

    #[test]
    fn test_cyclic_sequence_terminates() {
        let seq = Rc::new(RefCell::new(vec![Local::Int(1)]));
        seq.borrow_mut().push(Local::Seq(seq.clone()));

        let value = shorten(&Local::Seq(seq), &Limits::default());
        assert_eq!(value, json!([1, CYCLE_MARKER]));
    }

    #[test]
    fn test_cyclic_map_terminates() {
        let map = Rc::new(RefCell::new(BTreeMap::from([(
            "n".to_string(),
            Local::Int(1),
        )])));
        map.borrow_mut()
            .insert("self".to_string(), Local::Map(map.clone()));

        let value = shorten(&Local::Map(map), &Limits::default());
        assert_eq!(value, json!({"n": 1, "self": CYCLE_MARKER}));
    }

    #[test]
    fn test_shared_container_is_not_a_cycle() {
        // the same container referenced twice side by side is aliasing,
        // not recursion
        let shared = Rc::new(RefCell::new(vec![Local::Int(1)]));
        let value = shorten(
            &Local::seq(vec![Local::Seq(shared.clone()), Local::Seq(shared)]),
            &Limits::default(),
        );
        assert_eq!(value, json!([[1], [1]]));
    }

    struct PanickyDisplay;

    impl fmt::Display for PanickyDisplay {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("refusing to render");
        }
    }

    #[test]
    fn test_unrepresentable_value_degrades() {
        let value = shorten(&Local::repr(PanickyDisplay), &Limits::default());
        assert_eq!(value, json!(UNREPRESENTABLE));
    }

    #[test]
    fn test_repr_renders_and_truncates() {
        let limits = limits(4, 50);
        let value = shorten(&Local::repr(123456789u64), &limits);
        assert_eq!(value, json!(format!("1234{TRUNCATION_MARKER}")));
    }
}
