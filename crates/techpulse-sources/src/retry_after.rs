//! `Retry-After` header parsing, used when an upstream signals
//! too-many-requests (§4.1): numeric seconds, or an RFC 7231 HTTP-date.

use tracing::debug;

/// Parse a `retry-after` header value.
///
/// ```
/// use techpulse_sources::parse_retry_after;
///
/// assert_eq!(parse_retry_after("60"), Some(60));
/// assert_eq!(parse_retry_after("invalid"), None);
/// ```
pub fn parse_retry_after(header_value: &str) -> Option<u64> {
    if let Ok(seconds) = header_value.trim().parse::<u64>() {
        debug!(retry_after_seconds = seconds, "parsed retry-after header (numeric)");
        return Some(seconds);
    }

    if let Ok(target_time) = chrono::DateTime::parse_from_rfc2822(header_value) {
        let now = chrono::Utc::now();
        let duration = target_time.signed_duration_since(now);
        let seconds = duration.num_seconds().max(0) as u64;
        debug!(retry_after_seconds = seconds, %target_time, "parsed retry-after header (http-date)");
        return Some(seconds);
    }

    debug!(header_value, "failed to parse retry-after header");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_format() {
        assert_eq!(parse_retry_after("60"), Some(60));
        assert_eq!(parse_retry_after("  60  "), Some(60));
        assert_eq!(parse_retry_after("0"), Some(0));
    }

    #[test]
    fn rejects_invalid_input() {
        assert_eq!(parse_retry_after(""), None);
        assert_eq!(parse_retry_after("invalid"), None);
        assert_eq!(parse_retry_after("-60"), None);
    }

    #[test]
    fn parses_future_http_date() {
        let future = chrono::Utc::now() + chrono::Duration::seconds(120);
        let seconds = parse_retry_after(&future.to_rfc2822()).unwrap();
        assert!((118..=122).contains(&seconds));
    }

    #[test]
    fn past_http_date_is_zero() {
        let past = chrono::Utc::now() - chrono::Duration::seconds(60);
        assert_eq!(parse_retry_after(&past.to_rfc2822()), Some(0));
    }
}
