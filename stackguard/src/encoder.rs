use serde_json::json;

use stackguard_types::StackFields;

/// Encodes captured stack fields into a standalone JSON payload string.
///
/// This is the legacy event flavor: the resulting string rides in the
/// event's `payload` slot with the `"sentry"` type tag, for sinks that
/// forward an opaque pre-encoded blob instead of reading the structured
/// fields.
pub fn encode_stacktrace(fields: &StackFields) -> Result<String, serde_json::Error> {
    let frames = serde_json::to_value(&fields.frames)?;
    serde_json::to_string(&json!({
        "culprit": fields.culprit,
        "stacktrace": { "frames": frames },
    }))
}
