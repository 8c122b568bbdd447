//! Token lifetime configuration
//!
//! Accepts a bare number of seconds (`3600`) or unit segments (`1h`, `15m`,
//! `1h30m`, `90s`). Anything else, including values above
//! [`MAX_TOKEN_LIFETIME`], falls back to [`DEFAULT_TOKEN_LIFETIME`] with a
//! warning, so a missing value can never produce already-expired tokens.

use std::time::Duration;
use tracing::warn;

/// Fallback lifetime when the configured value is absent or unusable
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Longest lifetime accepted from configuration (ten years)
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Parse a lifetime string. Returns `None` for empty, invalid, zero or
/// over-long values.
pub fn parse_lifetime(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let secs = match raw.parse::<u64>() {
        Ok(secs) => secs,
        Err(_) => parse_segments(raw)?,
    };

    (secs > 0 && secs <= MAX_TOKEN_LIFETIME.as_secs()).then(|| Duration::from_secs(secs))
}

/// Sum of `<digits><unit>` segments, in seconds
fn parse_segments(raw: &str) -> Option<u64> {
    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in raw.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let unit = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        let value: u64 = digits.parse().ok()?;
        total = total.checked_add(value.checked_mul(unit)?)?;
        digits.clear();
    }

    // Trailing digits without a unit
    if !digits.is_empty() {
        return None;
    }

    Some(total)
}

/// Resolve the configured lifetime, warning and falling back when needed
pub fn resolve_lifetime(raw: Option<&str>) -> Duration {
    match raw {
        None => {
            warn!(
                fallback_secs = DEFAULT_TOKEN_LIFETIME.as_secs(),
                "Token lifetime not configured, using fallback"
            );
            DEFAULT_TOKEN_LIFETIME
        }
        Some(value) => parse_lifetime(value).unwrap_or_else(|| {
            warn!(
                value = %value,
                fallback_secs = DEFAULT_TOKEN_LIFETIME.as_secs(),
                "Token lifetime is not a valid positive duration, using fallback"
            );
            DEFAULT_TOKEN_LIFETIME
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_lifetime("3600"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_lifetime(" 90 "), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_lifetime("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_lifetime("15m"), Some(Duration::from_secs(900)));
        assert_eq!(parse_lifetime("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_lifetime("2m30s"), Some(Duration::from_secs(150)));
    }

    #[test]
    fn test_rejects_unusable_values() {
        for raw in ["", "0", "0s", "-5", "abc", "10x", "1h30", "h", "1.5h"] {
            assert_eq!(parse_lifetime(raw), None, "{raw}");
        }
    }

    #[test]
    fn test_resolve_falls_back() {
        assert_eq!(resolve_lifetime(None), DEFAULT_TOKEN_LIFETIME);
        assert_eq!(resolve_lifetime(Some("garbage")), DEFAULT_TOKEN_LIFETIME);
        assert_eq!(resolve_lifetime(Some("0")), DEFAULT_TOKEN_LIFETIME);
        assert_eq!(resolve_lifetime(Some("15m")), Duration::from_secs(900));
    }

    #[test]
    fn test_over_long_lifetime_falls_back() {
        assert_eq!(parse_lifetime("9223372036854775807"), None);
        assert_eq!(parse_lifetime("18446744073709551615"), None);
        assert_eq!(parse_lifetime("100000h"), None);
        assert_eq!(
            resolve_lifetime(Some("9223372036854775807")),
            DEFAULT_TOKEN_LIFETIME
        );

        let max = MAX_TOKEN_LIFETIME.as_secs().to_string();
        assert_eq!(parse_lifetime(&max), Some(MAX_TOKEN_LIFETIME));
    }
}
