//! Client configuration and per-call overrides.
//!
//! A [`Config`] is validated when it is built and never changes afterwards.
//! Per-call adjustments go through [`ConfigOverride`] and [`Config::merge`],
//! which returns a new `Config` and leaves the original untouched, so calls
//! with different overrides can run concurrently against one client.

use crate::enums::ErrorCode;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Production JSON-RPC endpoint.
pub const DEFAULT_BASE_URI: &str = "https://api.shipengine.com/jsonrpc";
/// Per-attempt timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Number of rate-limit retries used when none is configured.
pub const DEFAULT_RETRIES: u32 = 1;
/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

const API_KEY_REQUIRED: &str = "A ShipEngine API key must be specified.";

/// Validated configuration for talking to ShipEngine API.
///
/// # Examples
///
/// ```
/// use shipengine::Config;
/// use std::time::Duration;
///
/// let config = Config::builder("TEST_my_api_key")
///     .timeout(Duration::from_secs(10))
///     .retries(3)
///     .build()?;
///
/// assert_eq!(config.retries(), 3);
/// assert_eq!(config.page_size(), 50);
/// # Ok::<(), shipengine::Error>(())
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConfigFile")]
pub struct Config {
    #[serde(skip_serializing)]
    api_key: String,
    base_uri: String,
    #[serde(serialize_with = "seconds::serialize")]
    timeout: Duration,
    retries: u32,
    page_size: u32,
}

impl Config {
    /// Creates a configuration with default values for everything but the API key.
    ///
    /// # Errors
    ///
    /// Returns a [`Error::Validation`] if the API key is empty or starts with whitespace.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(api_key).build()
    }

    pub fn builder(api_key: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(api_key)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Hard wall-clock bound for a single attempt, and the longest rate-limit
    /// cooldown the client is willing to wait out.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// How many times a rate-limited call is re-issued.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns a new configuration with `overrides` applied on top of `self`.
    ///
    /// Fields left as `None` in the override keep the value from `self`. With
    /// no override, the result is a copy of `self`.
    ///
    /// # Errors
    ///
    /// The merged configuration is validated like any other; an overriding
    /// API key that is empty fails here.
    ///
    /// # Examples
    ///
    /// ```
    /// use shipengine::{Config, ConfigOverride};
    ///
    /// let base = Config::new("TEST_my_api_key")?;
    /// let merged = base.merge(Some(&ConfigOverride::new().retries(0)))?;
    ///
    /// assert_eq!(merged.retries(), 0);
    /// assert_eq!(base.retries(), 1);
    /// # Ok::<(), shipengine::Error>(())
    /// ```
    pub fn merge(&self, overrides: Option<&ConfigOverride>) -> Result<Config> {
        let Some(overrides) = overrides else {
            return Ok(self.clone());
        };

        ConfigBuilder {
            api_key: overrides
                .api_key
                .clone()
                .unwrap_or_else(|| self.api_key.clone()),
            base_uri: overrides
                .base_uri
                .clone()
                .unwrap_or_else(|| self.base_uri.clone()),
            timeout: overrides.timeout.unwrap_or(self.timeout),
            retries: overrides.retries.unwrap_or(self.retries),
            page_size: overrides.page_size.unwrap_or(self.page_size),
        }
        .build()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_uri", &self.base_uri)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("page_size", &self.page_size)
            .finish()
    }
}

/// Builder for [`Config`].
#[derive(Clone)]
pub struct ConfigBuilder {
    api_key: String,
    base_uri: String,
    timeout: Duration,
    retries: u32,
    page_size: u32,
}

impl fmt::Debug for ConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigBuilder")
            .field("api_key", &"<redacted>")
            .field("base_uri", &self.base_uri)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl ConfigBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_uri: DEFAULT_BASE_URI.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    /// Whole seconds only; [`build`](Self::build) rejects fractional values.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Validates the collected values and builds the [`Config`].
    pub fn build(self) -> Result<Config> {
        if self.api_key.is_empty() || self.api_key.starts_with(char::is_whitespace) {
            return Err(Error::validation(
                API_KEY_REQUIRED,
                ErrorCode::FieldValueRequired,
            ));
        }
        if self.timeout.subsec_nanos() != 0 {
            return Err(Error::invalid_field_value(
                "timeout",
                "Timeout must be a whole number of seconds.",
                format!("{:?}", self.timeout),
            ));
        }
        if self.page_size == 0 {
            return Err(Error::invalid_field_value(
                "page_size",
                "Page size must be one or greater.",
                self.page_size,
            ));
        }

        Ok(Config {
            api_key: self.api_key,
            base_uri: self.base_uri,
            timeout: self.timeout,
            retries: self.retries,
            page_size: self.page_size,
        })
    }
}

/// A partial configuration applied on top of a [`Config`] for a single call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverride {
    pub api_key: Option<String>,
    pub base_uri: Option<String>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub page_size: Option<u32>,
}

impl ConfigOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

/// On-disk shape of a configuration; every field but the key is optional.
#[derive(Deserialize)]
struct ConfigFile {
    api_key: String,
    base_uri: Option<String>,
    #[serde(default, with = "opt_seconds")]
    timeout: Option<Duration>,
    retries: Option<u32>,
    page_size: Option<u32>,
}

impl TryFrom<ConfigFile> for Config {
    type Error = Error;

    fn try_from(file: ConfigFile) -> Result<Self> {
        let mut builder = ConfigBuilder::new(file.api_key);
        if let Some(base_uri) = file.base_uri {
            builder = builder.base_uri(base_uri);
        }
        if let Some(timeout) = file.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(retries) = file.retries {
            builder = builder.retries(retries);
        }
        if let Some(page_size) = file.page_size {
            builder = builder.page_size(page_size);
        }
        builder.build()
    }
}

mod seconds {
    use serde::{Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        value.as_secs().serialize(serializer)
    }
}

mod opt_seconds {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{ErrorSource, ErrorType};

    fn assert_api_key_error(err: Error) {
        match &err {
            Error::Validation(details) => {
                assert_eq!(details.message, API_KEY_REQUIRED);
                assert_eq!(details.request_id, None);
                assert_eq!(details.source, Some(ErrorSource::ShipEngine));
                assert_eq!(details.error_type, Some(ErrorType::Validation));
                assert_eq!(details.error_code, Some(ErrorCode::FieldValueRequired));
            }
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::new("baz_sim").unwrap();
        assert_eq!(config.api_key(), "baz_sim");
        assert_eq!(config.base_uri(), DEFAULT_BASE_URI);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.retries(), 1);
        assert_eq!(config.page_size(), 50);
    }

    #[test]
    fn test_empty_api_key_rejected() {
        assert_api_key_error(Config::new("").unwrap_err());
    }

    #[test]
    fn test_whitespace_api_key_rejected() {
        assert_api_key_error(Config::new(" ").unwrap_err());
        assert_api_key_error(Config::new("\tbaz").unwrap_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = Config::builder("baz_sim").page_size(0).build().unwrap_err();
        assert!(matches!(err, Error::InvalidFieldValue { .. }));
    }

    #[test]
    fn test_sub_second_timeout_rejected() {
        for timeout in [Duration::from_millis(500), Duration::from_millis(1500)] {
            let err = Config::builder("baz_sim").timeout(timeout).build().unwrap_err();
            match &err {
                Error::InvalidFieldValue { field_name, .. } => assert_eq!(field_name, "timeout"),
                other => panic!("Expected InvalidFieldValue, got {:?}", other),
            }
            assert_eq!(err.error_code(), Some(ErrorCode::InvalidFieldValue));
        }
    }

    #[test]
    fn test_merge_rejects_sub_second_timeout() {
        let config = Config::new("baz_sim").unwrap();
        let err = config
            .merge(Some(&ConfigOverride::new().timeout(Duration::from_millis(500))))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFieldValue { .. }));
    }

    #[test]
    fn test_timeout_round_trips_in_whole_seconds() {
        let config = Config::builder("baz_sim")
            .timeout(Duration::from_secs(7))
            .build()
            .unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["timeout"], 7);

        let mut file = json;
        file["api_key"] = "baz_sim".into();
        let restored: Config = serde_json::from_value(file).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_merge_without_override_copies() {
        let config = Config::builder("baz_sim").retries(2).build().unwrap();
        let merged = config.merge(None).unwrap();
        assert_eq!(merged, config);
    }

    #[test]
    fn test_merge_applies_only_set_fields() {
        let config = Config::builder("baz_sim")
            .timeout(Duration::from_secs(15))
            .retries(2)
            .build()
            .unwrap();

        let overrides = ConfigOverride::new()
            .timeout(Duration::from_secs(1))
            .base_uri("http://localhost:8080/jsonrpc");
        let merged = config.merge(Some(&overrides)).unwrap();

        assert_eq!(merged.timeout(), Duration::from_secs(1));
        assert_eq!(merged.base_uri(), "http://localhost:8080/jsonrpc");
        assert_eq!(merged.retries(), 2);
        assert_eq!(merged.api_key(), "baz_sim");

        // The source config is untouched.
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert_eq!(config.base_uri(), DEFAULT_BASE_URI);
    }

    #[test]
    fn test_merge_is_independent_of_later_override_changes() {
        let config = Config::new("baz_sim").unwrap();
        let mut overrides = ConfigOverride::new().retries(4);
        let merged = config.merge(Some(&overrides)).unwrap();

        overrides.retries = Some(9);
        assert_eq!(merged.retries(), 4);
    }

    #[test]
    fn test_merge_validates_api_key() {
        let config = Config::new("baz_sim").unwrap();
        let err = config
            .merge(Some(&ConfigOverride::new().api_key("")))
            .unwrap_err();
        assert_api_key_error(err);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config::new("super_secret").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api_key": "baz_sim", "timeout": 10}"#).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.retries(), DEFAULT_RETRIES);

        let result: std::result::Result<Config, _> = serde_json::from_str(r#"{"api_key": ""}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_skips_api_key() {
        let config = Config::new("super_secret").unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("api_key").is_none());
        assert_eq!(json["timeout"], 5);
    }
}
