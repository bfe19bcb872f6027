//! Error types raised to callers of the SDK.
//!
//! Every failure, whether it was reported by ShipEngine API, detected while
//! validating input, or caused by the network, surfaces as one [`Error`]
//! variant. The variants mirror the broad error categories of the API and all
//! of them carry the same [`ErrorDetails`], so callers can branch on the kind
//! of failure and still get at the message, request id and codes uniformly.

use crate::enums::{ErrorCode, ErrorSource, ErrorType, UnknownVariant};
use std::fmt;
use std::time::Duration;

/// Documentation page linked from rate limit and timeout errors.
pub const RATE_LIMIT_DOCS_URL: &str = "https://www.shipengine.com/docs/rate-limits";

/// Fields shared by every [`Error`] variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetails {
    /// Human-readable description of the failure.
    pub message: String,
    /// Correlation id of the request that failed, when one was sent.
    pub request_id: Option<String>,
    /// Where the error originated.
    pub source: Option<ErrorSource>,
    /// Broad category of the error.
    pub error_type: Option<ErrorType>,
    /// Specific error code.
    pub error_code: Option<ErrorCode>,
    /// Link to further documentation.
    pub url: Option<String>,
}

impl ErrorDetails {
    /// Creates details with only a message set.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            request_id: None,
            source: None,
            error_type: None,
            error_code: None,
            url: None,
        }
    }

    /// Builds details from raw wire strings, rejecting values that are not
    /// members of their enumeration.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownVariant`] for the first of `source`, `error_type` or
    /// `error_code` that is not recognized.
    pub fn from_wire(
        message: impl Into<String>,
        request_id: Option<String>,
        source: Option<&str>,
        error_type: Option<&str>,
        error_code: Option<&str>,
    ) -> std::result::Result<Self, UnknownVariant> {
        Ok(Self {
            message: message.into(),
            request_id,
            source: source.map(str::parse).transpose()?,
            error_type: error_type.map(str::parse).transpose()?,
            error_code: error_code.map(str::parse).transpose()?,
            url: None,
        })
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_source(mut self, source: ErrorSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = Some(error_type);
        self
    }

    pub fn with_code(mut self, error_code: ErrorCode) -> Self {
        self.error_code = Some(error_code);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(request_id) = &self.request_id {
            write!(f, " (request {})", request_id)?;
        }
        Ok(())
    }
}

/// The error type for every SDK operation.
///
/// # Examples
///
/// ```no_run
/// use shipengine::{Error, ShipEngine};
///
/// # async fn example() -> Result<(), Error> {
/// let client = ShipEngine::new("TEST_my_api_key")?;
///
/// match client.call("carrier.listAccounts.v1", None, None).await {
///     Ok(response) => println!("{}", response.data),
///     Err(Error::RateLimitExceeded { retry_after, .. }) => {
///         eprintln!("still rate limited, cooldown {:?}", retry_after);
///     }
///     Err(e) => eprintln!("{} ({:?})", e, e.error_code()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A problem with a ShipEngine or third-party account.
    #[error("{0}")]
    AccountStatus(ErrorDetails),

    /// A business rule was violated.
    #[error("{0}")]
    BusinessRule(ErrorDetails),

    /// Authentication or authorization failed.
    #[error("{0}")]
    ClientSecurity(ErrorDetails),

    /// A server-side or otherwise unexpected system failure (HTTP 404/5xx).
    #[error("{0}")]
    ClientSystem(ErrorDetails),

    /// Input did not pass validation, either locally or on the server.
    #[error("{0}")]
    Validation(ErrorDetails),

    /// The configured timeout was (or would have been) exceeded.
    ///
    /// `retry_after` is set when the server asked for a cooldown longer than
    /// the configured timeout.
    #[error("{details}")]
    ClientTimeout {
        details: ErrorDetails,
        retry_after: Option<Duration>,
    },

    /// A single field was set to an invalid value.
    #[error("{details}")]
    InvalidFieldValue {
        details: ErrorDetails,
        field_name: String,
        field_value: String,
    },

    /// The server rate limited the request.
    ///
    /// This is the only error the client retries on its own, after waiting
    /// `retry_after`.
    #[error("{details}")]
    RateLimitExceeded {
        details: ErrorDetails,
        retry_after: Duration,
    },

    /// Any other failure, including transport errors and error payloads of a
    /// type without a dedicated variant.
    #[error("{0}")]
    ShipEngine(ErrorDetails),
}

impl Error {
    /// A generic error with only a message.
    pub fn generic(message: impl Into<String>) -> Self {
        Error::ShipEngine(ErrorDetails::new(message))
    }

    /// A generic `system` / `unspecified` error originating in the SDK itself.
    pub fn system(message: impl Into<String>) -> Self {
        Error::ShipEngine(
            ErrorDetails::new(message)
                .with_source(ErrorSource::ShipEngine)
                .with_type(ErrorType::System)
                .with_code(ErrorCode::Unspecified),
        )
    }

    /// A locally detected validation failure.
    pub fn validation(message: impl Into<String>, error_code: ErrorCode) -> Self {
        Error::Validation(
            ErrorDetails::new(message)
                .with_source(ErrorSource::ShipEngine)
                .with_type(ErrorType::Validation)
                .with_code(error_code),
        )
    }

    /// A field that was set to a value outside its allowed range.
    pub fn invalid_field_value(
        field_name: impl Into<String>,
        reason: &str,
        field_value: impl fmt::Display,
    ) -> Self {
        let field_name = field_name.into();
        let field_value = field_value.to_string();
        Error::InvalidFieldValue {
            details: ErrorDetails::new(format!(
                "{} - {} {} was provided.",
                field_name, reason, field_value
            ))
            .with_source(ErrorSource::ShipEngine)
            .with_type(ErrorType::Validation)
            .with_code(ErrorCode::InvalidFieldValue),
            field_name,
            field_value,
        }
    }

    /// The server asked the client to wait `retry_after` before trying again.
    pub fn rate_limit_exceeded(
        retry_after: Duration,
        source: ErrorSource,
        request_id: Option<String>,
    ) -> Self {
        let mut details = ErrorDetails::new("You have exceeded the rate limit.")
            .with_source(source)
            .with_type(ErrorType::System)
            .with_code(ErrorCode::RateLimitExceeded)
            .with_url(RATE_LIMIT_DOCS_URL);
        details.request_id = request_id;
        Error::RateLimitExceeded {
            details,
            retry_after,
        }
    }

    /// The request could not complete within `timeout`.
    pub fn client_timeout(
        timeout: Duration,
        retry_after: Option<Duration>,
        source: ErrorSource,
        request_id: Option<String>,
    ) -> Self {
        let mut details = ErrorDetails::new(format!(
            "The request took longer than the {} seconds allowed.",
            timeout.as_secs()
        ))
        .with_source(source)
        .with_type(ErrorType::System)
        .with_code(ErrorCode::Timeout)
        .with_url(RATE_LIMIT_DOCS_URL);
        details.request_id = request_id;
        Error::ClientTimeout {
            details,
            retry_after,
        }
    }

    /// Returns the fields shared by all variants.
    pub fn details(&self) -> &ErrorDetails {
        match self {
            Error::AccountStatus(details)
            | Error::BusinessRule(details)
            | Error::ClientSecurity(details)
            | Error::ClientSystem(details)
            | Error::Validation(details)
            | Error::ShipEngine(details) => details,
            Error::ClientTimeout { details, .. }
            | Error::InvalidFieldValue { details, .. }
            | Error::RateLimitExceeded { details, .. } => details,
        }
    }

    pub fn message(&self) -> &str {
        &self.details().message
    }

    pub fn request_id(&self) -> Option<&str> {
        self.details().request_id.as_deref()
    }

    /// Where the error originated.
    ///
    /// Named `error_source` to stay clear of [`std::error::Error::source`].
    pub fn error_source(&self) -> Option<ErrorSource> {
        self.details().source
    }

    pub fn error_type(&self) -> Option<ErrorType> {
        self.details().error_type
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.details().error_code
    }

    pub fn url(&self) -> Option<&str> {
        self.details().url.as_deref()
    }

    /// Returns the server-advertised cooldown, if this error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimitExceeded { retry_after, .. } => Some(*retry_after),
            Error::ClientTimeout { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns `true` if the client may retry the request on its own.
    ///
    /// Only [`Error::RateLimitExceeded`] qualifies. Whether a retry actually
    /// happens also depends on the configured timeout and retry budget.
    ///
    /// # Examples
    ///
    /// ```
    /// use shipengine::{Error, ErrorSource};
    /// use std::time::Duration;
    ///
    /// let err = Error::rate_limit_exceeded(Duration::from_secs(2), ErrorSource::ShipEngine, None);
    /// assert!(err.is_retryable());
    ///
    /// let err = Error::system("Unable to connect to the database");
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimitExceeded { .. })
    }
}

impl From<UnknownVariant> for Error {
    fn from(err: UnknownVariant) -> Self {
        Error::generic(err.to_string())
    }
}

/// A specialized `Result` type for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;
