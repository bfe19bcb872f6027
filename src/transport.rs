//! Single-attempt HTTP transport.
//!
//! [`Transport::send`] issues one JSON-RPC call: it builds the envelope and
//! headers, publishes the request-sent event, POSTs with the configured
//! timeout, publishes the response-received event and hands the response to
//! [`classify`](crate::classify::classify). Connection failures where no
//! response arrived at all are retried here, paced by a [`RetryStrategy`].

use crate::classify::classify;
use crate::config::Config;
use crate::enums::{ErrorCode, ErrorSource, ErrorType};
use crate::envelope::RequestEnvelope;
use crate::events::{Event, EventName, EventNotifier, RequestSentEvent, ResponseReceivedEvent};
use crate::retry::RetryStrategy;
use crate::{Error, ErrorDetails, Result};
use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::{Duration, Instant, SystemTime};
use url::Url;

/// Environment variable that redirects every call, e.g. to a local simulator.
pub const BASE_URI_ENV_VAR: &str = "CLIENT_BASE_URI";

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "api-key";

/// Returns the base URI to call: `env_override` when set and non-empty,
/// otherwise the configured one.
///
/// # Examples
///
/// ```
/// use shipengine::transport::resolve_base_uri;
/// use shipengine::Config;
///
/// let config = Config::new("TEST_key")?;
/// assert_eq!(resolve_base_uri(&config, None), "https://api.shipengine.com/jsonrpc");
/// assert_eq!(
///     resolve_base_uri(&config, Some("http://localhost:8080".into())),
///     "http://localhost:8080"
/// );
/// # Ok::<(), shipengine::Error>(())
/// ```
pub fn resolve_base_uri(config: &Config, env_override: Option<String>) -> String {
    match env_override {
        Some(uri) if !uri.trim().is_empty() => uri.trim().to_string(),
        _ => config.base_uri().to_string(),
    }
}

/// `shipengine-rust/<version> <os>/<arch>`
pub fn user_agent() -> String {
    format!(
        "shipengine-rust/{} {}/{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

fn request_message(method: &str, url: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("Calling the ShipEngine {} API at {}", method, url)
    } else {
        format!("Retrying the ShipEngine {} API at {}", method, url)
    }
}

fn response_message(method: &str, url: &str, status: Option<u16>, attempt: u32) -> String {
    match status {
        None => format!("Failed to receive a response from the ShipEngine {} API", method),
        Some(status) if attempt == 0 => format!(
            "Received an HTTP {} response from the ShipEngine {} API",
            status, method
        ),
        Some(_) => request_message(method, url, attempt),
    }
}

fn request_headers(config: &Config) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let agent = HeaderValue::from_str(&user_agent())
        .map_err(|e| Error::system(format!("Invalid User-Agent header: {}", e)))?;
    headers.insert(USER_AGENT, agent);

    let mut api_key = HeaderValue::from_str(config.api_key()).map_err(|_| {
        Error::validation(
            "A ShipEngine API key may only contain visible ASCII characters.",
            ErrorCode::InvalidFieldValue,
        )
    })?;
    api_key.set_sensitive(true);
    headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);

    Ok(headers)
}

/// The `result` of a successful attempt and the id it was sent under.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub request_id: String,
    pub result: Value,
}

/// Sends single attempts of a call and publishes their events.
#[derive(Debug, Clone)]
pub struct Transport {
    http_client: reqwest::Client,
    connection_retry: RetryStrategy,
    notifier: EventNotifier,
}

impl Transport {
    pub fn new(
        http_client: reqwest::Client,
        connection_retry: RetryStrategy,
        notifier: EventNotifier,
    ) -> Self {
        Self {
            http_client,
            connection_retry,
            notifier,
        }
    }

    pub fn notifier(&self) -> &EventNotifier {
        &self.notifier
    }

    /// Performs attempt number `attempt` (zero-based) of `method`.
    ///
    /// Every attempt gets a new correlation id. On success the envelope's
    /// `result` is returned verbatim.
    ///
    /// # Errors
    ///
    /// * Any classified error for the received response.
    /// * [`Error::ClientTimeout`] if no response arrives within `config.timeout()`.
    /// * A generic `system` error wrapping the low-level failure when no
    ///   response could be obtained at all.
    /// * The first error returned by an event listener.
    pub async fn send(
        &self,
        method: &str,
        params: Option<&Value>,
        attempt: u32,
        config: &Config,
    ) -> Result<Reply> {
        let envelope = RequestEnvelope::new(method, params.cloned());
        let request_id = envelope.id.clone();
        let base_uri = resolve_base_uri(config, std::env::var(BASE_URI_ENV_VAR).ok());
        let url = Url::parse(&base_uri).map_err(|e| {
            Error::invalid_field_value("base_uri", &format!("must be a valid URL ({}).", e), &base_uri)
        })?;
        let headers = request_headers(config)?;
        let body = serde_json::to_value(&envelope)
            .map_err(|e| Error::system(format!("Failed to serialize the request: {}", e)))?;

        self.notifier.dispatch(
            EventName::RequestSent,
            &Event::RequestSent(RequestSentEvent {
                timestamp: SystemTime::now(),
                message: request_message(method, url.as_str(), attempt),
                request_id: request_id.clone(),
                url: url.to_string(),
                headers: headers.clone(),
                body: body.clone(),
                retry: attempt,
                timeout: config.timeout(),
            }),
        )?;

        tracing::debug!(
            method = %method,
            url = %url,
            request_id = %request_id,
            attempt = attempt,
            "Executing JSON-RPC request"
        );

        let start = Instant::now();
        let received = match self
            .post(url.clone(), headers, &body, config.timeout(), config.retries())
            .await
        {
            Ok(response) => {
                let status = response.status();
                let response_headers = response.headers().clone();
                response
                    .text()
                    .await
                    .map(|text| (status, response_headers, text))
            }
            Err(e) => Err(e),
        };
        let elapsed = start.elapsed();

        let (status, response_headers, text) = match received {
            Ok(received) => received,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    method = %method,
                    request_id = %request_id,
                    attempt = attempt,
                    "No response received"
                );
                self.notifier.dispatch(
                    EventName::ResponseReceived,
                    &Event::ResponseReceived(ResponseReceivedEvent {
                        timestamp: SystemTime::now(),
                        message: response_message(method, url.as_str(), None, attempt),
                        request_id: request_id.clone(),
                        url: url.to_string(),
                        status_code: None,
                        headers: HeaderMap::new(),
                        body: None,
                        retry: attempt,
                        elapsed,
                    }),
                )?;
                return Err(transport_error(e, method, config.timeout(), request_id));
            }
        };

        tracing::info!(
            status = status.as_u16(),
            latency_ms = elapsed.as_millis() as u64,
            attempt = attempt,
            request_id = %request_id,
            "Received HTTP response"
        );

        self.notifier.dispatch(
            EventName::ResponseReceived,
            &Event::ResponseReceived(ResponseReceivedEvent {
                timestamp: SystemTime::now(),
                message: response_message(method, url.as_str(), Some(status.as_u16()), attempt),
                request_id: request_id.clone(),
                url: url.to_string(),
                status_code: Some(status),
                headers: response_headers.clone(),
                body: serde_json::from_str(&text).ok(),
                retry: attempt,
                elapsed,
            }),
        )?;

        let result = classify(status, &response_headers, &text, &request_id, config)?;
        Ok(Reply { request_id, result })
    }

    /// POSTs `body`, retrying connection failures up to `max_retries` times.
    ///
    /// All tries and the waits between them share one deadline, `timeout`
    /// from the start of the attempt.
    async fn post(
        &self,
        url: Url,
        headers: HeaderMap,
        body: &Value,
        timeout: Duration,
        max_retries: u32,
    ) -> reqwest::Result<reqwest::Response> {
        let deadline = Instant::now() + timeout;
        let mut retry = 0;
        loop {
            let result = self
                .http_client
                .post(url.clone())
                .headers(headers.clone())
                .json(body)
                .timeout(deadline.saturating_duration_since(Instant::now()))
                .send()
                .await;

            match result {
                Err(e) if e.is_connect() && !e.is_timeout() => {
                    retry += 1;
                    let Some(delay) = connection_retry_delay(
                        &self.connection_retry,
                        retry,
                        max_retries,
                        Instant::now(),
                        deadline,
                    ) else {
                        return Err(e);
                    };
                    tracing::warn!(
                        error = %e,
                        retry = retry,
                        delay_ms = delay.as_millis() as u64,
                        "Connection failed - retrying after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

/// Wait before connection retry `retry`, or `None` when the strategy is
/// spent or the wait would reach `deadline`.
fn connection_retry_delay(
    strategy: &RetryStrategy,
    retry: u32,
    max_retries: u32,
    now: Instant,
    deadline: Instant,
) -> Option<Duration> {
    strategy
        .delay_for_attempt(retry, max_retries)
        .filter(|delay| now + *delay < deadline)
}

fn transport_error(e: reqwest::Error, method: &str, timeout: Duration, request_id: String) -> Error {
    if e.is_timeout() {
        Error::client_timeout(timeout, None, ErrorSource::ShipEngine, Some(request_id))
    } else {
        Error::ShipEngine(
            ErrorDetails::new(format!(
                "An unknown error occurred while calling the ShipEngine {} API: {}",
                method, e
            ))
            .with_request_id(request_id)
            .with_source(ErrorSource::ShipEngine)
            .with_type(ErrorType::System)
            .with_code(ErrorCode::Unspecified),
        )
    }
}
