//! Serde helper for duration strings such as "500ms", "30s" or "5m".

use serde::{self, Deserialize, Deserializer};
use std::time::Duration;

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.as_deref()
        .map(parse_duration)
        .transpose()
        .map(Option::unwrap_or_default)
        .map_err(serde::de::Error::custom)
}

pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Duration::ZERO);
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (value, unit) = s.split_at(split);

    let value: f64 = value
        .parse()
        .map_err(|_| format!("invalid duration number: {}", value))?;

    let seconds = match unit.trim() {
        "ms" => value / 1000.0,
        "s" | "" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => return Err(format!("unknown duration unit: {}", other)),
    };

    Ok(Duration::from_secs_f64(seconds))
}
