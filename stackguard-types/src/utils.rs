//! Serde helpers for the event protocol.

use std::time::{Duration, SystemTime};

/// Converts a `SystemTime` into a float unix timestamp.
pub fn datetime_to_timestamp(st: &SystemTime) -> f64 {
    match st.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => duration.as_secs_f64(),
        Err(_) => 0.0,
    }
}

/// Converts a float unix timestamp back into a `SystemTime`.
pub fn timestamp_to_datetime(ts: f64) -> Option<SystemTime> {
    if !ts.is_finite() || ts < 0.0 {
        return None;
    }
    SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs_f64(ts))
}

/// Serializes a `SystemTime` as seconds since the unix epoch, the
/// `epoch_timestamp` convention of the event wire format.
pub mod ts_seconds_float {
    use std::fmt;

    use serde::{de, ser};

    use super::*;

    /// Serializes a `SystemTime` as float seconds.
    pub fn serialize<S>(st: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match st.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(duration) => {
                if duration.subsec_nanos() == 0 {
                    serializer.serialize_u64(duration.as_secs())
                } else {
                    serializer.serialize_f64(duration.as_secs_f64())
                }
            }
            Err(_) => Err(ser::Error::custom(format!(
                "invalid `SystemTime` instance: {st:?}"
            ))),
        }
    }

    /// Deserializes a `SystemTime` from a numeric unix timestamp.
    pub fn deserialize<'de, D>(d: D) -> Result<SystemTime, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        d.deserialize_any(SecondsTimestampVisitor)
    }

    struct SecondsTimestampVisitor;

    impl de::Visitor<'_> for SecondsTimestampVisitor {
        type Value = SystemTime;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a unix timestamp")
        }

        fn visit_f64<E>(self, value: f64) -> Result<SystemTime, E>
        where
            E: de::Error,
        {
            timestamp_to_datetime(value)
                .ok_or_else(|| E::custom(format!("invalid timestamp: {value}")))
        }

        fn visit_i64<E>(self, value: i64) -> Result<SystemTime, E>
        where
            E: de::Error,
        {
            timestamp_to_datetime(value as f64)
                .ok_or_else(|| E::custom(format!("invalid timestamp: {value}")))
        }

        fn visit_u64<E>(self, value: u64) -> Result<SystemTime, E>
        where
            E: de::Error,
        {
            timestamp_to_datetime(value as f64)
                .ok_or_else(|| E::custom(format!("invalid timestamp: {value}")))
        }
    }
}
