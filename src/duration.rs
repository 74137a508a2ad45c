//! Human-readable durations for config values such as `"60m"`, `"3600s"` or `"2s"`.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{de, Deserialize, Deserializer, Serializer};

const UNITS: &[(&str, u64)] = &[
    ("ms", 1),
    ("d", 24 * 60 * 60 * 1000),
    ("h", 60 * 60 * 1000),
    ("m", 60 * 1000),
    ("s", 1000),
];

/// Parse a duration string with a single unit suffix.
///
/// Supported units are `d`, `h`, `m`, `s` and `ms`. Input is trimmed and
/// case-insensitive.
///
/// ```
/// use mnav_tracker::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("60m").unwrap(), Duration::from_secs(3600));
/// assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_ascii_lowercase();

    // "ms" must be tried before "s" and "m".
    let Some((num, millis_per_unit)) = UNITS
        .iter()
        .find_map(|(suffix, factor)| s.strip_suffix(suffix).map(|num| (num, *factor)))
    else {
        bail!("Duration must end with d, h, m, s, or ms");
    };

    if num.is_empty() {
        bail!("Duration is missing a number");
    }

    let num: u64 = num
        .parse()
        .with_context(|| format!("Invalid number in duration: {s}"))?;
    let millis = num
        .checked_mul(millis_per_unit)
        .context("Duration is too large")?;

    Ok(Duration::from_millis(millis))
}

/// Format a duration using the largest unit that divides it evenly.
///
/// ```
/// use mnav_tracker::duration::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(3600)), "1h");
/// assert_eq!(format_duration(Duration::from_secs(90)), "90s");
/// ```
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis == 0 {
        return "0s".to_string();
    }

    for (suffix, factor) in [("d", 86_400_000u128), ("h", 3_600_000), ("m", 60_000), ("s", 1000)] {
        if millis % factor == 0 {
            return format!("{}{suffix}", millis / factor);
        }
    }
    format!("{millis}ms")
}

/// Serde adapter: `#[serde(deserialize_with = "deserialize_duration")]`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

/// Serde adapter: `#[serde(serialize_with = "serialize_duration")]`.
pub fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(*d))
}
