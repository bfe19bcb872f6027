//! Extraction of the cooldown advertised by a rate-limited (HTTP 429) response.
//!
//! The cooldown is read from the `Retry-After` header when the server sends
//! one, and from the error payload's `retry_after` otherwise.

use crate::envelope::ErrorData;
use crate::{Error, Result};
use http::HeaderMap;
use std::time::{Duration, SystemTime};

/// Rate limit information taken from a 429 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// How long the server asked the client to wait before retrying.
    pub retry_after: Duration,

    /// Requests remaining in the current window (`X-RateLimit-Remaining`), if sent.
    pub remaining: Option<u64>,
}

impl RateLimitInfo {
    /// Extracts rate limit information from a response.
    ///
    /// The header takes precedence over the payload. When neither carries a
    /// cooldown, `retry_after` is zero.
    ///
    /// # Errors
    ///
    /// Returns a generic `system` error if the `Retry-After` header is present
    /// but is neither whole seconds nor an HTTP date (for example `"10.1"`).
    ///
    /// # Examples
    ///
    /// ```
    /// use shipengine::rate_limit::RateLimitInfo;
    /// use http::HeaderMap;
    /// use std::time::Duration;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("retry-after", "3".parse().unwrap());
    ///
    /// let info = RateLimitInfo::from_response(&headers, None).unwrap();
    /// assert_eq!(info.retry_after, Duration::from_secs(3));
    /// ```
    pub fn from_response(headers: &HeaderMap, data: Option<&ErrorData>) -> Result<Self> {
        let retry_after = match parse_retry_after(headers)? {
            Some(delay) => delay,
            None => data
                .and_then(|data| data.retry_after)
                .map(Duration::from_secs)
                .unwrap_or(Duration::ZERO),
        };

        Ok(Self {
            retry_after,
            remaining: parse_rate_limit_remaining(headers),
        })
    }
}

/// Parses the Retry-After header.
///
/// Supports delay-seconds and HTTP-date. A date in the past means no wait.
fn parse_retry_after(headers: &HeaderMap) -> Result<Option<Duration>> {
    let Some(header) = headers.get("retry-after") else {
        return Ok(None);
    };
    let unexpected = || Error::system("Unexpected Retry-After header value.");
    let value = header.to_str().map_err(|_| unexpected())?.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Ok(Some(Duration::from_secs(seconds)));
    }

    let date_time = httpdate::parse_http_date(value).map_err(|_| unexpected())?;
    Ok(Some(
        date_time
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO),
    ))
}

/// Parses X-RateLimit-Remaining header.
fn parse_rate_limit_remaining(headers: &HeaderMap) -> Option<u64> {
    let header = headers.get("x-ratelimit-remaining")?.to_str().ok()?;
    header.parse().ok()
}
