//! Helpers shared by all adapters
//!
//! Status-code mapping lives here so every adapter classifies 429/401/5xx
//! identically. The queue and aggregator rely on that uniformity.

use super::error::ProviderError;
use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use reqwest::Response;

/// Map a non-success HTTP response into the error taxonomy.
///
/// Consumes the response body for the error message. 429 becomes
/// [`ProviderError::RateLimited`] (honoring a `Retry-After` header), 401/403
/// become [`ProviderError::Authentication`], everything else is a generic API
/// error carrying the status.
pub(super) async fn error_for_status(
    provider: &'static str,
    response: Response,
) -> ProviderError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    match status {
        429 => ProviderError::rate_limited(provider, retry_after),
        401 | 403 => ProviderError::authentication(provider, truncate(&body)),
        _ => ProviderError::api(provider, status, truncate(&body)),
    }
}

/// Generate a random lowercase local part, optionally under a caller prefix
pub(super) fn random_local_part(prefix: Option<&str>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| {
            let n = rng.gen_range(0..36);
            char::from_digit(n, 36).unwrap_or('x')
        })
        .collect();
    match prefix {
        Some(p) if !p.is_empty() => format!("{}.{}", sanitize(p), suffix),
        _ => suffix,
    }
}

/// Parse an RFC 3339 timestamp, falling back to "now" on malformed input
pub(super) fn parse_rfc3339(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a unix-seconds timestamp (string or integer on the wire)
pub(super) fn parse_unix_seconds(value: &serde_json::Value) -> DateTime<Utc> {
    let secs = match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    };
    secs.and_then(|s| Utc.timestamp_opt(s, 0).single())
        .unwrap_or_else(Utc::now)
}

fn sanitize(prefix: &str) -> String {
    prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(20)
        .collect()
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= 200 {
        return trimmed.to_string();
    }
    // Back the cut off to a char boundary; bodies are arbitrary UTF-8
    let mut cut = 200;
    while !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &trimmed[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_local_part_prefix() {
        let local = random_local_part(Some("Sign-Up!"));
        assert!(local.starts_with("signup."));
        assert_eq!(local.len(), "signup.".len() + 8);
    }

    #[test]
    fn test_random_local_part_bare() {
        assert_eq!(random_local_part(None).len(), 8);
        assert_eq!(random_local_part(Some("")).len(), 8);
    }

    #[test]
    fn test_truncate_backs_off_to_char_boundary() {
        // 199 ASCII bytes put the 200-byte cut inside the first heart
        let body = format!("{}❤❤", "x".repeat(199));
        let out = truncate(&body);
        assert_eq!(out, format!("{}...", "x".repeat(199)));

        let exact = "y".repeat(200);
        assert_eq!(truncate(&exact), exact);
    }

    #[test]
    fn test_parse_unix_seconds_variants() {
        let from_number = parse_unix_seconds(&serde_json::json!(1700000000));
        let from_string = parse_unix_seconds(&serde_json::json!("1700000000"));
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.timestamp(), 1700000000);
    }
}
