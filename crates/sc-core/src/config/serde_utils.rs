//! Serde helpers for configuration types

/// Serializes `std::time::Duration` as whole seconds, which reads better in
/// TOML than serde's default `{ secs, nanos }` table.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Config {
///     #[serde(with = "sc_core::config::serde_utils::duration_secs")]
///     dial_timeout: Duration,
/// }
/// ```
pub mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Same as [`duration_secs`] for optional values; `None` is left out of the file.
pub mod option_duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timeouts {
        #[serde(with = "duration_secs")]
        dial: Duration,
        #[serde(with = "option_duration_secs", default)]
        discovery: Option<Duration>,
    }

    #[test]
    fn test_duration_secs_serialize() {
        let t = Timeouts {
            dial: Duration::from_secs(3),
            discovery: Some(Duration::from_secs(10)),
        };
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"dial":3,"discovery":10}"#);
    }

    #[test]
    fn test_missing_optional_duration() {
        let t: Timeouts = serde_json::from_str(r#"{"dial":5}"#).unwrap();
        assert_eq!(t.dial, Duration::from_secs(5));
        assert_eq!(t.discovery, None);
    }

    #[test]
    fn test_null_optional_duration() {
        let t: Timeouts = serde_json::from_str(r#"{"dial":1,"discovery":null}"#).unwrap();
        assert_eq!(t.discovery, None);
    }
}
