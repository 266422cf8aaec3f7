/// Serde helper functions for custom serialization/deserialization
use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Serialize Duration as whole milliseconds
pub mod duration_millis {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Serialize a signal by its canonical name (`"SIGTERM"`), accepting names
/// with or without the `SIG` prefix as well as raw numbers on the way in
#[cfg(unix)]
pub mod signal_name {
    use super::*;
    use nix::sys::signal::Signal;

    pub fn serialize<S>(signal: &Signal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(signal.as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Signal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("unknown signal {raw:?}")))
    }

    /// Parse `"TERM"`, `"sigterm"`, `"SIGTERM"` or `"15"`
    pub fn parse(raw: &str) -> Option<Signal> {
        let trimmed = raw.trim();
        if let Ok(number) = trimmed.parse::<i32>() {
            return Signal::try_from(number).ok();
        }
        let upper = trimmed.to_ascii_uppercase();
        let name = if upper.starts_with("SIG") {
            upper
        } else {
            format!("SIG{upper}")
        };
        name.parse::<Signal>().ok()
    }
}

/// Skip serializing if bool is false
#[inline]
pub fn is_false(value: &bool) -> bool {
    !*value
}

/// Skip serializing if Option is None
#[inline]
pub fn is_none<T>(value: &Option<T>) -> bool {
    value.is_none()
}

/// Skip serializing if Vec is empty
#[inline]
pub fn is_empty_vec<T>(value: &Vec<T>) -> bool {
    value.is_empty()
}
