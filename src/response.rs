//! Successful call results.

use std::ops::Deref;
use std::time::Duration;

/// The outcome of a successful call: the decoded `result` plus details of how
/// it was obtained.
///
/// # Examples
///
/// ```
/// use shipengine::Response;
/// use std::time::Duration;
///
/// let response = Response::new(vec![1, 2, 3], "req_abc", Duration::from_millis(120), 2);
///
/// assert_eq!(response.len(), 3);
/// assert!(response.was_retried());
///
/// let count = response.map(|items| items.len());
/// assert_eq!(count.data, 3);
/// assert_eq!(count.request_id, "req_abc");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub data: T,

    /// Correlation id of the attempt that succeeded.
    pub request_id: String,

    /// Wall-clock time of the whole call, including rate-limit waits.
    pub latency: Duration,

    /// Attempts made, `1` when the first one succeeded.
    pub attempts: u32,
}

impl<T> Response<T> {
    pub fn new(data: T, request_id: impl Into<String>, latency: Duration, attempts: u32) -> Self {
        Self {
            data,
            request_id: request_id.into(),
            latency,
            attempts,
        }
    }

    /// Transforms the data, keeping the call details.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            request_id: self.request_id,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
