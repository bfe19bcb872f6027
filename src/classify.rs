//! Maps an HTTP status and response body onto a result or a typed [`Error`].
//!
//! Status mapping:
//!
//! | Status | Body | Outcome |
//! |---|---|---|
//! | 429 | any | [`Error::RateLimitExceeded`], or [`Error::ClientTimeout`] when the cooldown exceeds the timeout |
//! | 500/502/503/504 | structured `error` | [`Error::ClientSystem`] with the payload's fields |
//! | any other | structured `error` | variant chosen by `error.data.type` |
//! | 2xx | `result` | success, `result` returned verbatim |
//! | 404/500/502/503/504 | unstructured | [`Error::ClientSystem`] with a synthesized message |
//! | any other | unstructured | generic `system` error naming the base URI |

use crate::config::Config;
use crate::envelope::{ErrorPayload, ResponseEnvelope};
use crate::enums::{ErrorCode, ErrorSource, ErrorType};
use crate::error::ErrorDetails;
use crate::rate_limit::RateLimitInfo;
use crate::{Error, Result};
use http::{HeaderMap, StatusCode};
use serde_json::Value;

/// Classifies a received response.
///
/// `request_id` is the id of the envelope that was sent; it is used as the
/// error's request id when the response does not echo one back.
///
/// Classification is a pure function of its inputs: the same status, headers
/// and body always produce the same outcome.
pub fn classify(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    request_id: &str,
    config: &Config,
) -> Result<Value> {
    let envelope = ResponseEnvelope::parse(body).ok();
    let request_id = envelope
        .as_ref()
        .and_then(ResponseEnvelope::request_id)
        .unwrap_or_else(|| request_id.to_string());
    let payload = envelope.as_ref().and_then(|envelope| envelope.error.as_ref());

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(rate_limited(headers, payload, request_id, config));
    }

    if let Some(payload) = payload {
        if status.is_client_error() {
            tracing::error!(
                status = status.as_u16(),
                request_id = %request_id,
                message = %payload.message,
                "Client error (4xx)"
            );
        } else if status.is_server_error() {
            tracing::warn!(
                status = status.as_u16(),
                request_id = %request_id,
                message = %payload.message,
                "Server error (5xx)"
            );
        }
        return Err(from_payload(status, payload, request_id));
    }

    if status.is_success() {
        return match envelope.and_then(|envelope| envelope.result) {
            Some(result) => Ok(result),
            None => {
                tracing::error!(
                    status = status.as_u16(),
                    raw_response = %body,
                    "Response contained neither a result nor an error"
                );
                Err(Error::ShipEngine(
                    ErrorDetails::new(format!(
                        "Received a malformed response from the ShipEngine API at {}.",
                        config.base_uri()
                    ))
                    .with_request_id(request_id)
                    .with_source(ErrorSource::ShipEngine)
                    .with_type(ErrorType::System)
                    .with_code(ErrorCode::Unspecified),
                ))
            }
        };
    }

    tracing::warn!(
        status = status.as_u16(),
        raw_response = %body,
        "Non-success response without a structured error"
    );
    Err(unstructured(status, request_id, config))
}

fn rate_limited(
    headers: &HeaderMap,
    payload: Option<&ErrorPayload>,
    request_id: String,
    config: &Config,
) -> Error {
    let data = payload.and_then(|payload| payload.data.as_ref());

    let source = match data.and_then(|data| data.source.as_deref()) {
        None => ErrorSource::ShipEngine,
        Some(raw) => match raw.parse::<ErrorSource>() {
            Ok(source) => source,
            Err(unknown) => return unknown_value(unknown.to_string(), request_id),
        },
    };

    let info = match RateLimitInfo::from_response(headers, data) {
        Ok(info) => info,
        Err(Error::ShipEngine(details)) => {
            return Error::ShipEngine(details.with_request_id(request_id))
        }
        Err(other) => return other,
    };

    tracing::warn!(
        request_id = %request_id,
        retry_after_secs = info.retry_after.as_secs(),
        remaining = ?info.remaining,
        timeout_secs = config.timeout().as_secs(),
        "Rate limited"
    );

    if info.retry_after > config.timeout() {
        Error::client_timeout(
            config.timeout(),
            Some(info.retry_after),
            source,
            Some(request_id),
        )
    } else {
        Error::rate_limit_exceeded(info.retry_after, source, Some(request_id))
    }
}

fn from_payload(status: StatusCode, payload: &ErrorPayload, request_id: String) -> Error {
    let data = payload.data.as_ref();
    let details = ErrorDetails::from_wire(
        payload.message.clone(),
        Some(request_id.clone()),
        data.and_then(|data| data.source.as_deref()),
        data.and_then(|data| data.error_type.as_deref()),
        data.and_then(|data| data.code.as_deref()),
    );
    let details = match details {
        Ok(details) => details,
        Err(unknown) => return unknown_value(unknown.to_string(), request_id),
    };

    if matches!(status.as_u16(), 500 | 502 | 503 | 504) {
        return Error::ClientSystem(details);
    }

    match details.error_type {
        Some(ErrorType::AccountStatus) => Error::AccountStatus(details),
        Some(ErrorType::Security) => Error::ClientSecurity(details),
        Some(ErrorType::Validation) => Error::Validation(details),
        Some(ErrorType::BusinessRules) => Error::BusinessRule(details),
        Some(ErrorType::System) => Error::ClientSystem(details),
        Some(ErrorType::Authorization) | Some(ErrorType::Error) | None => {
            Error::ShipEngine(details)
        }
    }
}

fn unstructured(status: StatusCode, request_id: String, config: &Config) -> Error {
    match status.as_u16() {
        404 => Error::ClientSystem(
            ErrorDetails::new(format!(
                "The ShipEngine API endpoint {} was not found (HTTP 404).",
                config.base_uri()
            ))
            .with_request_id(request_id)
            .with_source(ErrorSource::ShipEngine)
            .with_type(ErrorType::System)
            .with_code(ErrorCode::NotFound),
        ),
        500 | 502 | 503 | 504 => Error::ClientSystem(
            ErrorDetails::new(format!(
                "The ShipEngine API at {} returned HTTP {}.",
                config.base_uri(),
                status.as_u16()
            ))
            .with_request_id(request_id)
            .with_source(ErrorSource::ShipEngine)
            .with_type(ErrorType::System)
            .with_code(ErrorCode::Unspecified),
        ),
        other => Error::ShipEngine(
            ErrorDetails::new(format!(
                "An unexpected HTTP {} response was received from the ShipEngine API at {}.",
                other,
                config.base_uri()
            ))
            .with_request_id(request_id)
            .with_source(ErrorSource::ShipEngine)
            .with_type(ErrorType::System)
            .with_code(ErrorCode::Unspecified),
        ),
    }
}

fn unknown_value(message: String, request_id: String) -> Error {
    tracing::error!(request_id = %request_id, %message, "Unrecognized value in error payload");
    Error::ShipEngine(ErrorDetails::new(message).with_request_id(request_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;
    use std::time::Duration;

    fn config(timeout_secs: u64) -> Config {
        Config::builder("baz")
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap()
    }

    fn error_body(message: &str, source: &str, error_type: &str, code: &str) -> String {
        json!({
            "jsonrpc": "2.0",
            "id": "req_DezVNUvRkAP819f3JeqiuS",
            "error": {
                "code": -32603,
                "message": message,
                "data": {"source": source, "type": error_type, "code": code}
            }
        })
        .to_string()
    }

    fn run(status: u16, headers: &HeaderMap, body: &str, timeout_secs: u64) -> Result<Value> {
        classify(
            StatusCode::from_u16(status).unwrap(),
            headers,
            body,
            "req_local",
            &config(timeout_secs),
        )
    }

    #[test]
    fn success_returns_result_verbatim() {
        let body = json!({"jsonrpc": "2.0", "id": "req_1", "result": {"carrierAccounts": []}});
        let result = run(200, &HeaderMap::new(), &body.to_string(), 5).unwrap();
        assert_eq!(result, json!({"carrierAccounts": []}));
    }

    #[test]
    fn falsy_result_is_still_success() {
        for result in [json!(null), json!([]), json!(false), json!(0), json!({})] {
            let body = json!({"id": "req_1", "result": result.clone()}).to_string();
            assert_eq!(run(200, &HeaderMap::new(), &body, 5).unwrap(), result);
        }
    }

    #[test]
    fn server_error_maps_to_client_system() {
        let body = error_body(
            "Unable to connect to the database",
            "shipengine",
            "system",
            "unspecified",
        );
        let err = run(500, &HeaderMap::new(), &body, 5).unwrap_err();

        assert!(matches!(err, Error::ClientSystem(_)));
        assert_eq!(err.message(), "Unable to connect to the database");
        assert_eq!(err.request_id(), Some("req_DezVNUvRkAP819f3JeqiuS"));
        assert_eq!(err.error_source(), Some(ErrorSource::ShipEngine));
        assert_eq!(err.error_type(), Some(ErrorType::System));
        assert_eq!(err.error_code(), Some(ErrorCode::Unspecified));
    }

    #[test]
    fn gateway_statuses_override_payload_type() {
        let cases = [
            (500, "business_rules", ErrorType::BusinessRules),
            (502, "validation", ErrorType::Validation),
            (503, "validation", ErrorType::Validation),
            (504, "account_status", ErrorType::AccountStatus),
            (503, "security", ErrorType::Security),
        ];

        for (status, error_type, expected) in cases {
            let body = error_body("Upstream unavailable", "carrier", error_type, "unspecified");
            let err = run(status, &HeaderMap::new(), &body, 5).unwrap_err();
            assert!(
                matches!(err, Error::ClientSystem(_)),
                "{} with type {} mapped to {:?}",
                status,
                error_type,
                err
            );
            assert_eq!(err.error_type(), Some(expected));
            assert_eq!(err.error_source(), Some(ErrorSource::Carrier));
            assert_eq!(err.message(), "Upstream unavailable");
        }
    }

    #[test]
    fn numeric_response_id_keeps_structured_error() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 7,
            "error": {
                "code": -32602,
                "message": "Invalid address",
                "data": {"source": "shipengine", "type": "validation", "code": "invalid_address"}
            }
        })
        .to_string();

        let err = run(400, &HeaderMap::new(), &body, 5).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.message(), "Invalid address");
        assert_eq!(err.request_id(), Some("7"));
    }

    #[test]
    fn error_type_selects_variant() {
        let cases = [
            ("account_status", "subscription_inactive"),
            ("security", "unauthorized"),
            ("validation", "invalid_address"),
            ("business_rules", "carrier_not_supported"),
            ("system", "not_found"),
            ("authorization", "forbidden"),
            ("error", "unspecified"),
        ];

        for (error_type, code) in cases {
            let body = error_body("boom", "carrier", error_type, code);
            let err = run(400, &HeaderMap::new(), &body, 5).unwrap_err();
            let matched = match error_type {
                "account_status" => matches!(err, Error::AccountStatus(_)),
                "security" => matches!(err, Error::ClientSecurity(_)),
                "validation" => matches!(err, Error::Validation(_)),
                "business_rules" => matches!(err, Error::BusinessRule(_)),
                "system" => matches!(err, Error::ClientSystem(_)),
                _ => matches!(err, Error::ShipEngine(_)),
            };
            assert!(matched, "{} mapped to {:?}", error_type, err);
            assert_eq!(err.error_source(), Some(ErrorSource::Carrier));
            assert_eq!(err.error_code().map(|c| c.as_str()), Some(code));
        }
    }

    #[test]
    fn error_payload_on_200_is_still_an_error() {
        let body = error_body("Invalid address", "shipengine", "validation", "invalid_address");
        let err = run(200, &HeaderMap::new(), &body, 5).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn unknown_wire_value_fails_fast() {
        let body = error_body("boom", "shipengine", "tracking", "unspecified");
        let err = run(400, &HeaderMap::new(), &body, 5).unwrap_err();

        assert!(matches!(err, Error::ShipEngine(_)));
        assert!(err.message().contains("[tracking]"));
        assert_eq!(err.error_type(), None);
        assert_eq!(err.request_id(), Some("req_DezVNUvRkAP819f3JeqiuS"));
    }

    #[test]
    fn rate_limit_within_timeout() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("3"));
        let body = error_body(
            "You have exceeded the rate limit.",
            "shipengine",
            "system",
            "rate_limit_exceeded",
        );

        let err = run(429, &headers, &body, 10).unwrap_err();
        assert!(matches!(err, Error::RateLimitExceeded { .. }));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
        assert_eq!(err.error_code(), Some(ErrorCode::RateLimitExceeded));
        assert_eq!(err.request_id(), Some("req_DezVNUvRkAP819f3JeqiuS"));
    }

    #[test]
    fn rate_limit_beyond_timeout_is_client_timeout() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("5"));

        let err = run(429, &headers, "", 1).unwrap_err();
        assert!(matches!(err, Error::ClientTimeout { .. }));
        assert_eq!(
            err.message(),
            "The request took longer than the 1 seconds allowed."
        );
        assert_eq!(err.error_code(), Some(ErrorCode::Timeout));
        assert_eq!(err.request_id(), Some("req_local"));
    }

    #[test]
    fn rate_limit_from_payload_retry_after() {
        let body = json!({
            "id": "req_1",
            "error": {
                "code": -32603,
                "message": "You have exceeded the rate limit.",
                "data": {
                    "source": "carrier",
                    "type": "system",
                    "code": "rate_limit_exceeded",
                    "retryAfter": 2
                }
            }
        })
        .to_string();

        let err = run(429, &HeaderMap::new(), &body, 5).unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(err.error_source(), Some(ErrorSource::Carrier));
    }

    #[test]
    fn rate_limit_with_unknown_source() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("1"));
        let body = error_body("Slow down", "warehouse", "system", "rate_limit_exceeded");

        let err = run(429, &headers, &body, 5).unwrap_err();
        assert!(matches!(err, Error::ShipEngine(_)));
        assert!(err.message().contains("[warehouse]"));
        assert_eq!(err.request_id(), Some("req_DezVNUvRkAP819f3JeqiuS"));
    }

    #[test]
    fn rate_limit_with_bad_header() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("10.1"));

        let err = run(429, &headers, "", 5).unwrap_err();
        assert!(matches!(err, Error::ShipEngine(_)));
        assert_eq!(err.message(), "Unexpected Retry-After header value.");
        assert_eq!(err.request_id(), Some("req_local"));
    }

    #[test]
    fn unstructured_404_is_client_system() {
        let err = run(404, &HeaderMap::new(), "Not Found", 5).unwrap_err();
        assert!(matches!(err, Error::ClientSystem(_)));
        assert_eq!(err.error_code(), Some(ErrorCode::NotFound));
        assert!(err.message().contains(crate::config::DEFAULT_BASE_URI));
        assert_eq!(err.request_id(), Some("req_local"));
    }

    #[test]
    fn unstructured_other_status_is_generic() {
        let err = run(418, &HeaderMap::new(), "<html>teapot</html>", 5).unwrap_err();
        assert!(matches!(err, Error::ShipEngine(_)));
        assert!(err.message().contains("HTTP 418"));
        assert!(err.message().contains(crate::config::DEFAULT_BASE_URI));
        assert_eq!(err.error_type(), Some(ErrorType::System));
    }

    #[test]
    fn success_without_result_is_malformed() {
        let err = run(200, &HeaderMap::new(), r#"{"id":"req_1"}"#, 5).unwrap_err();
        assert!(matches!(err, Error::ShipEngine(_)));
        assert!(err.message().contains("malformed"));

        let err = run(200, &HeaderMap::new(), "not json", 5).unwrap_err();
        assert!(matches!(err, Error::ShipEngine(_)));
    }

    #[test]
    fn classification_is_deterministic() {
        let body = error_body("Invalid", "shipengine", "validation", "invalid_address");
        let first = run(400, &HeaderMap::new(), &body, 5).unwrap_err();
        let second = run(400, &HeaderMap::new(), &body, 5).unwrap_err();
        assert_eq!(first, second);
    }
}
