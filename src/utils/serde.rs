/*!
 * Serde utilities for common serialization/deserialization patterns.
 *
 * Durations in run definitions and configuration are written as plain numbers
 * (seconds, possibly fractional) rather than serde's default `{secs, nanos}` form.
 */

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// `Option<Duration>` expressed as seconds.
///
/// Accepts integers, floats and numeric strings so hand-written JSON can quote
/// values without tripping the loader:
///
/// ```json
/// { "timeout_seconds": 30 }
/// { "timeout_seconds": 0.25 }
/// { "timeout_seconds": "45" }
/// { "timeout_seconds": null }
/// ```
pub mod optional_duration_secs {
    use super::*;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
        let seconds = match value {
            None | Some(serde_json::Value::Null) => return Ok(None),
            Some(serde_json::Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| D::Error::custom(format!("Invalid numeric value: {n}")))?,
            Some(serde_json::Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("Cannot parse '{s}' as seconds")))?,
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "Expected a number of seconds, found: {other}"
                )))
            }
        };

        if !seconds.is_finite() || seconds < 0.0 {
            return Err(D::Error::custom(format!(
                "Duration must be a non-negative number of seconds, got {seconds}"
            )));
        }

        Ok(Some(Duration::from_secs_f64(seconds)))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Deserialize, Serialize)]
    struct Holder {
        #[serde(default, with = "super::optional_duration_secs")]
        timeout_seconds: Option<Duration>,
    }

    #[test]
    fn test_duration_forms() {
        let h: Holder = serde_json::from_str(r#"{"timeout_seconds": 30}"#).unwrap();
        assert_eq!(h.timeout_seconds, Some(Duration::from_secs(30)));

        let h: Holder = serde_json::from_str(r#"{"timeout_seconds": 0.25}"#).unwrap();
        assert_eq!(h.timeout_seconds, Some(Duration::from_millis(250)));

        let h: Holder = serde_json::from_str(r#"{"timeout_seconds": "45"}"#).unwrap();
        assert_eq!(h.timeout_seconds, Some(Duration::from_secs(45)));

        let h: Holder = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(h.timeout_seconds, None);

        let h: Holder = serde_json::from_str(r#"{"timeout_seconds": null}"#).unwrap();
        assert_eq!(h.timeout_seconds, None);
    }

    #[test]
    fn test_duration_rejects_garbage() {
        assert!(serde_json::from_str::<Holder>(r#"{"timeout_seconds": -1}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"timeout_seconds": "soon"}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"timeout_seconds": [1]}"#).is_err());
    }

    #[test]
    fn test_duration_serializes_as_seconds() {
        let h = Holder {
            timeout_seconds: Some(Duration::from_millis(1500)),
        };
        assert_eq!(
            serde_json::to_string(&h).unwrap(),
            r#"{"timeout_seconds":1.5}"#
        );
    }
}
