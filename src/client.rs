//! The ShipEngine client.
//!
//! [`ShipEngine`] is the main entry point. Every operation funnels through
//! [`ShipEngine::call`], which merges per-call overrides into the client
//! configuration and runs the call under the rate-limit retry loop. Use
//! [`ClientBuilder`] to register event listeners or tune connection retries.

use crate::config::{Config, ConfigOverride};
use crate::events::{EventListener, EventName, EventNotifier};
use crate::models::{
    decode, Address, AddressValidateResult, CarrierAccount, CarrierAccountList, PackageLookup,
    TrackPackageResult, ADDRESS_VALIDATE_METHOD, LIST_CARRIER_ACCOUNTS_METHOD,
    TRACK_PACKAGE_METHOD,
};
use crate::retry::{self, RetryStrategy};
use crate::transport::Transport;
use crate::{Error, Response, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// A client for the ShipEngine JSON-RPC API.
///
/// Cloning is cheap; clones share configuration, listeners, the connection
/// pool and the carrier account cache.
///
/// # Examples
///
/// ```no_run
/// use shipengine::models::Address;
/// use shipengine::ShipEngine;
///
/// # async fn example() -> Result<(), shipengine::Error> {
/// let client = ShipEngine::new("TEST_my_api_key")?;
///
/// let address = Address::new(vec!["4 Jersey St".into()], "Boston", "MA", "02215", "US")?;
/// let result = client.validate_address(&address, None).await?;
/// println!("valid: {:?}", result.is_valid);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ShipEngine {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: Config,
    transport: Transport,
    carrier_accounts: Mutex<Option<Vec<CarrierAccount>>>,
}

impl ShipEngine {
    /// Creates a client with default settings for everything but the API key.
    ///
    /// # Errors
    ///
    /// Returns a [`Error::Validation`] if the API key is empty or starts with whitespace.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(Config::new(api_key)?).build()
    }

    pub fn builder(config: Config) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// The client-wide configuration. Per-call overrides never change it.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Calls `method` with `params` and returns its `result` verbatim.
    ///
    /// `overrides` apply to this call only. A rate-limited call is retried
    /// after the advertised cooldown while the cooldown is shorter than the
    /// timeout and retries remain; the returned future completes only after
    /// any such wait.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use shipengine::{ConfigOverride, ShipEngine};
    ///
    /// # async fn example() -> Result<(), shipengine::Error> {
    /// let client = ShipEngine::new("TEST_my_api_key")?;
    ///
    /// let response = client
    ///     .call(
    ///         "carrier.listAccounts.v1",
    ///         None,
    ///         Some(&ConfigOverride::new().retries(3)),
    ///     )
    ///     .await?;
    /// println!("{} after {} attempt(s)", response.request_id, response.attempts);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        overrides: Option<&ConfigOverride>,
    ) -> Result<Response<Value>> {
        let config = self.inner.config.merge(overrides)?;
        let start_time = Instant::now();

        let transport = &self.inner.transport;
        let params = params.as_ref();
        let attempt_config = &config;
        let result = retry::execute(&config, move |attempt| {
            transport.send(method, params, attempt, attempt_config)
        })
        .await;

        match result {
            Ok((reply, attempts)) => Ok(Response::new(
                reply.result,
                reply.request_id,
                start_time.elapsed(),
                attempts,
            )),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    method = %method,
                    request_id = e.request_id().unwrap_or_default(),
                    "ShipEngine call failed"
                );
                Err(e)
            }
        }
    }

    /// Validates and normalizes an address.
    ///
    /// The address is checked locally first; a locally invalid address is
    /// never sent.
    pub async fn validate_address(
        &self,
        address: &Address,
        overrides: Option<&ConfigOverride>,
    ) -> Result<AddressValidateResult> {
        address.validate()?;
        let response = self
            .call(
                ADDRESS_VALIDATE_METHOD,
                Some(json!({ "address": address })),
                overrides,
            )
            .await?;
        decode(ADDRESS_VALIDATE_METHOD, response.into_inner())
    }

    /// Validates several addresses one after another, stopping at the first error.
    pub async fn validate_addresses(
        &self,
        addresses: &[Address],
        overrides: Option<&ConfigOverride>,
    ) -> Result<Vec<AddressValidateResult>> {
        let mut results = Vec::with_capacity(addresses.len());
        for address in addresses {
            results.push(self.validate_address(address, overrides).await?);
        }
        Ok(results)
    }

    /// Fetches the connected carrier accounts, optionally for one carrier.
    ///
    /// An unfiltered fetch replaces the cache. A filtered one leaves it alone,
    /// since the cache always holds the full account list.
    pub async fn get_carrier_accounts(
        &self,
        carrier_code: Option<&str>,
        overrides: Option<&ConfigOverride>,
    ) -> Result<Vec<CarrierAccount>> {
        let accounts = self.fetch_carrier_accounts(carrier_code, overrides).await?;
        if carrier_code.is_none() {
            *self.inner.carrier_accounts.lock().await = Some(accounts.clone());
        }
        Ok(accounts)
    }

    /// Returns carrier accounts from the cache, fetching them on first use.
    ///
    /// Concurrent first uses share a single fetch. With `carrier_code` set,
    /// only that carrier's accounts are returned.
    pub async fn cached_carrier_accounts(
        &self,
        carrier_code: Option<&str>,
        overrides: Option<&ConfigOverride>,
    ) -> Result<Vec<CarrierAccount>> {
        let mut cache = self.inner.carrier_accounts.lock().await;
        if cache.is_none() {
            let fetched = self.fetch_carrier_accounts(None, overrides).await?;
            tracing::debug!(accounts = fetched.len(), "Populated carrier account cache");
            *cache = Some(fetched);
        }

        Ok(cache
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|account| carrier_code.map_or(true, |code| account.carrier_code == code))
            .cloned()
            .collect())
    }

    pub async fn clear_carrier_account_cache(&self) {
        *self.inner.carrier_accounts.lock().await = None;
    }

    /// Tracks a package by ShipEngine package id or by carrier tracking number.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use shipengine::models::TrackingQuery;
    /// use shipengine::ShipEngine;
    ///
    /// # async fn example() -> Result<(), shipengine::Error> {
    /// let client = ShipEngine::new("TEST_my_api_key")?;
    ///
    /// let by_id = client.track_package("pkg_1FedExAccepted", None).await?;
    /// let by_number = client
    ///     .track_package(TrackingQuery::new("fedex", "abcFedExDelivered"), None)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn track_package(
        &self,
        lookup: impl Into<PackageLookup>,
        overrides: Option<&ConfigOverride>,
    ) -> Result<TrackPackageResult> {
        let params = lookup.into().to_params()?;
        let response = self
            .call(TRACK_PACKAGE_METHOD, Some(params), overrides)
            .await?;
        decode(TRACK_PACKAGE_METHOD, response.into_inner())
    }

    async fn fetch_carrier_accounts(
        &self,
        carrier_code: Option<&str>,
        overrides: Option<&ConfigOverride>,
    ) -> Result<Vec<CarrierAccount>> {
        let params = carrier_code.map(|code| json!({ "carrierCode": code }));
        let response = self
            .call(LIST_CARRIER_ACCOUNTS_METHOD, params, overrides)
            .await?;
        let list: CarrierAccountList = decode(LIST_CARRIER_ACCOUNTS_METHOD, response.into_inner())?;
        Ok(list.carrier_accounts)
    }
}

impl std::fmt::Debug for ShipEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShipEngine")
            .field("config", &self.inner.config)
            .field("transport", &self.inner.transport)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ShipEngine`].
///
/// # Examples
///
/// ```
/// use shipengine::events::{EventName, TracingListener};
/// use shipengine::{Config, RetryStrategy, ShipEngine};
/// use std::sync::Arc;
///
/// let client = ShipEngine::builder(Config::new("TEST_my_api_key")?)
///     .event_listener(EventName::RequestSent, Arc::new(TracingListener))
///     .event_listener(EventName::ResponseReceived, Arc::new(TracingListener))
///     .connection_retry(RetryStrategy::None)
///     .build()?;
/// # Ok::<(), shipengine::Error>(())
/// ```
pub struct ClientBuilder {
    config: Config,
    notifier: EventNotifier,
    connection_retry: RetryStrategy,
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            notifier: EventNotifier::new(),
            connection_retry: RetryStrategy::default(),
            http_client: None,
        }
    }

    /// Registers a listener for one kind of event. Listeners run in
    /// registration order.
    pub fn event_listener(mut self, event_name: EventName, listener: Arc<dyn EventListener>) -> Self {
        self.notifier.register(event_name, listener);
        self
    }

    /// Sets how connection failures are retried within an attempt.
    ///
    /// Defaults to exponential backoff from 250ms up to 4s, with jitter.
    pub fn connection_retry(mut self, strategy: RetryStrategy) -> Self {
        self.connection_retry = strategy;
        self
    }

    /// Uses a preconfigured `reqwest` client, e.g. to share a connection pool.
    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Builds the configured [`ShipEngine`] client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn build(self) -> Result<ShipEngine> {
        let http_client = match self.http_client {
            Some(http_client) => http_client,
            None => reqwest::Client::builder().build().map_err(|e| {
                Error::system(format!("Failed to build HTTP client: {}", e))
            })?,
        };

        Ok(ShipEngine {
            inner: Arc::new(ClientInner {
                config: self.config,
                transport: Transport::new(http_client, self.connection_retry, self.notifier),
                carrier_accounts: Mutex::new(None),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TracingListener;

    #[test]
    fn test_new_rejects_empty_api_key() {
        let err = ShipEngine::new("").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.message(), "A ShipEngine API key must be specified.");
    }

    #[test]
    fn test_builder_registers_listeners() {
        let client = ShipEngine::builder(Config::new("TEST_key").unwrap())
            .event_listener(EventName::RequestSent, Arc::new(TracingListener))
            .build()
            .unwrap();

        let notifier = client.inner.transport.notifier();
        assert_eq!(notifier.listener_count(EventName::RequestSent), 1);
        assert_eq!(notifier.listener_count(EventName::ResponseReceived), 0);
    }

    #[tokio::test]
    async fn test_invalid_override_fails_before_sending() {
        let client = ShipEngine::new("TEST_key").unwrap();
        let err = client
            .call(
                LIST_CARRIER_ACCOUNTS_METHOD,
                None,
                Some(&ConfigOverride::new().api_key("")),
            )
            .await
            .unwrap_err();

        assert_eq!(err.message(), "A ShipEngine API key must be specified.");
        assert_eq!(client.config().api_key(), "TEST_key");
    }

    #[tokio::test]
    async fn test_invalid_address_is_not_sent() {
        let client = ShipEngine::new("TEST_key").unwrap();
        let address = Address {
            street: vec![],
            city_locality: "Boston".into(),
            state_province: "MA".into(),
            postal_code: "02215".into(),
            country_code: "US".into(),
            is_residential: None,
            name: String::new(),
            phone: String::new(),
            company: String::new(),
        };

        let err = client.validate_address(&address, None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
