//! Duration strings used in run configuration
//!
//! Accepts unit-suffixed components (`ms`, `s`, `m`, `h`) that may be chained,
//! e.g. `"1m30s"`. A bare number is read as seconds.

use std::time::Duration;

use super::types::ProfileError;

/// Longest duration any single setting, or a whole profile, may span
pub const MAX_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Seconds as a `Duration`, rejecting values past [`MAX_DURATION`]
pub(crate) fn bounded_secs(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| *d <= MAX_DURATION)
}

/// Parse a duration such as `"500ms"`, `"30s"`, `"1m"`, `"2h"` or `"1m30s"`
pub fn parse_duration(input: &str) -> Result<Duration, ProfileError> {
    let s = input.trim();
    let invalid = || ProfileError::InvalidDuration(input.to_string());
    let too_long = || ProfileError::DurationTooLong(input.to_string());

    if s.is_empty() {
        return Err(invalid());
    }
    if s.starts_with('-') {
        return Err(ProfileError::NegativeDuration(input.to_string()));
    }

    // Bare number: seconds
    if let Ok(secs) = s.parse::<f64>() {
        if !secs.is_finite() || secs < 0.0 {
            return Err(invalid());
        }
        return bounded_secs(secs).ok_or_else(too_long);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_end == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_end].parse().map_err(|_| invalid())?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_end..];

        let part = bounded_secs(value * scale).ok_or_else(too_long)?;
        total = total
            .checked_add(part)
            .filter(|d| *d <= MAX_DURATION)
            .ok_or_else(too_long)?;
    }

    Ok(total)
}

/// Format a duration in the same notation `parse_duration` accepts
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms == 0 {
        return "0s".to_string();
    }

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if seconds > 0 {
        out.push_str(&format!("{}s", seconds));
    }
    if millis > 0 {
        out.push_str(&format!("{}ms", millis));
    }
    out
}

/// Serde adapter: a duration written as a string (`"1m"`) or as seconds (`60`)
pub mod human {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Seconds(f64),
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => super::parse_duration(&text).map_err(de::Error::custom),
            Raw::Seconds(secs) if secs.is_finite() && secs >= 0.0 => {
                super::bounded_secs(secs).ok_or_else(|| {
                    de::Error::custom(format!(
                        "duration of {} seconds is longer than one year",
                        secs
                    ))
                })
            }
            Raw::Seconds(secs) => Err(de::Error::custom(format!(
                "duration must be a non-negative number of seconds, got {}",
                secs
            ))),
        }
    }
}

/// Serde adapter for optional durations in the same notation as [`human`]
pub mod human_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => super::human::serialize(d, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::human")] Duration);

        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unit_suffixes() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
    }

    #[test]
    fn test_parse_compound_and_bare() {
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1h0m5s").unwrap(), Duration::from_secs(3605));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration(" 10s ").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_duration("-5s"),
            Err(ProfileError::NegativeDuration(_))
        ));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_ok());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("1m30").is_err());
        assert!(parse_duration("inf").is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        for input in ["1e20", "99999999999999999999h", "8761h", "31536001"] {
            assert!(parse_duration(input).is_err(), "{input} accepted");
        }
        assert!(matches!(
            parse_duration("1e20"),
            Err(ProfileError::DurationTooLong(_))
        ));
        assert!(matches!(
            parse_duration("99999999999999999999h"),
            Err(ProfileError::DurationTooLong(_))
        ));
        // Each component fits, the sum does not
        assert!(matches!(
            parse_duration("8000h8000h"),
            Err(ProfileError::DurationTooLong(_))
        ));
        assert_eq!(parse_duration("8760h").unwrap(), MAX_DURATION);
    }

    #[test]
    fn test_format_matches_parse_notation() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2s500ms");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h1m1s");
    }

    #[test]
    fn test_human_serde_accepts_text_and_seconds() {
        #[derive(serde::Deserialize)]
        struct Holder {
            #[serde(with = "human")]
            d: Duration,
        }

        let text: Holder = serde_json::from_str(r#"{"d":"1m"}"#).unwrap();
        assert_eq!(text.d, Duration::from_secs(60));

        let secs: Holder = serde_json::from_str(r#"{"d":2.5}"#).unwrap();
        assert_eq!(secs.d, Duration::from_millis(2500));

        assert!(serde_json::from_str::<Holder>(r#"{"d":-1}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"d":"-1m"}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"d":1e20}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"d":"1e20"}"#).is_err());
    }
}
