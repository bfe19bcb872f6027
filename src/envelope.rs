//! JSON-RPC 2.0 request and response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version carried in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Outbound request envelope.
///
/// `params` is left out of the serialized form entirely when absent; some
/// servers treat a missing `params` differently from `"params": null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: String,
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RequestEnvelope {
    /// Wraps `method` and `params` into an envelope with a fresh correlation id.
    ///
    /// # Examples
    ///
    /// ```
    /// use shipengine::envelope::RequestEnvelope;
    ///
    /// let envelope = RequestEnvelope::new("carrier.listAccounts.v1", None);
    /// assert!(envelope.id.starts_with("req_"));
    ///
    /// let json = serde_json::to_value(&envelope).unwrap();
    /// assert!(json.get("params").is_none());
    /// ```
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: new_request_id(),
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// Generates a correlation id of the form `req_<32 hex digits>`.
pub fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().simple())
}

/// Inbound response envelope.
///
/// A well-formed response has exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Echoed correlation id. JSON-RPC allows strings and numbers.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl ResponseEnvelope {
    /// Parses a response body.
    ///
    /// `"result": null` is kept as `Some(Value::Null)` so that a present but
    /// falsy result still counts as a success.
    pub fn parse(body: &str) -> serde_json::Result<Self> {
        let raw: Value = serde_json::from_str(body)?;
        let has_result = raw.get("result").is_some();
        let mut envelope: ResponseEnvelope = serde_json::from_value(raw)?;
        if has_result && envelope.result.is_none() {
            envelope.result = Some(Value::Null);
        }
        Ok(envelope)
    }

    /// The echoed id as a string. Numeric ids are stringified; `null` and
    /// other shapes count as absent.
    pub fn request_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// The `error` member of a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Numeric protocol code. Some servers send it as a string.
    #[serde(default)]
    pub code: Option<Value>,
    pub message: String,
    #[serde(default)]
    pub data: Option<ErrorData>,
}

/// Structured error detail. Enumerated fields are kept as strings here and
/// validated when the typed error is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, alias = "fieldName")]
    pub field_name: Option<String>,
    /// Cooldown in whole seconds.
    #[serde(default, alias = "retryAfter")]
    pub retry_after: Option<u64>,
}
