//! # shipengine - an async client for the ShipEngine API
//!
//! Calls are JSON-RPC 2.0 envelopes POSTed to a single endpoint. Every
//! failure surfaces as one typed [`Error`] carrying the server's correlation
//! id, the error source, type and code, so callers can branch on what went
//! wrong without parsing messages.
//!
//! ## Quick Start
//!
//! ```no_run
//! use shipengine::models::Address;
//! use shipengine::{ConfigOverride, ShipEngine};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), shipengine::Error> {
//!     let client = ShipEngine::new("TEST_my_api_key")?;
//!
//!     let address = Address::new(
//!         vec!["4 Jersey St".into()],
//!         "Boston",
//!         "MA",
//!         "02215",
//!         "US",
//!     )?;
//!     let result = client.validate_address(&address, None).await?;
//!     println!("Valid: {:?}", result.is_valid);
//!
//!     // Per-call overrides leave the client configuration untouched
//!     let accounts = client
//!         .get_carrier_accounts(
//!             None,
//!             Some(&ConfigOverride::new().timeout(Duration::from_secs(15))),
//!         )
//!         .await?;
//!     println!("{} carrier accounts", accounts.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Rate limits
//!
//! When the API answers `429`, the call waits for the advertised cooldown and
//! tries again, up to [`Config::retries`] times. A cooldown that is not
//! shorter than [`Config::timeout`] is not waited out: it surfaces
//! immediately as [`Error::ClientTimeout`] (cooldown above the timeout) or
//! [`Error::RateLimitExceeded`].
//!
//! ## Error Handling
//!
//! ```no_run
//! use shipengine::{Error, ErrorCode, ShipEngine};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = ShipEngine::new("TEST_my_api_key")?;
//! match client.call("carrier.listAccounts.v1", None, None).await {
//!     Ok(response) => println!("Result: {}", response.data),
//!     Err(Error::RateLimitExceeded { retry_after, .. }) => {
//!         eprintln!("Rate limited, try again in {:?}", retry_after);
//!     }
//!     Err(e) if e.error_code() == Some(ErrorCode::Unauthorized) => {
//!         eprintln!("Check your API key ({:?})", e.request_id());
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Events
//!
//! Listeners registered through [`ClientBuilder::event_listener`] see every
//! attempt before it is sent and after its response arrives. See [`events`].

pub mod classify;
mod client;
pub mod config;
pub mod enums;
pub mod envelope;
mod error;
pub mod events;
pub mod models;
pub mod rate_limit;
mod response;
pub mod retry;
pub mod transport;

pub use client::{ClientBuilder, ShipEngine};
pub use config::{Config, ConfigBuilder, ConfigOverride};
pub use enums::{ErrorCode, ErrorSource, ErrorType};
pub use error::{Error, ErrorDetails, Result};
pub use response::Response;
pub use retry::RetryStrategy;
