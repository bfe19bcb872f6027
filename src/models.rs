//! Request and result types for the domain operations on
//! [`ShipEngine`](crate::ShipEngine).

use crate::enums::ErrorCode;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const ADDRESS_VALIDATE_METHOD: &str = "address.validate.v1";
pub const LIST_CARRIER_ACCOUNTS_METHOD: &str = "carrier.listAccounts.v1";
pub const TRACK_PACKAGE_METHOD: &str = "package.track.v1";

const MISSING_LOCALITY: &str = "Invalid address. Either the postal code or the city/locality and state/province must be specified.";

/// A mailing address.
///
/// Use [`Address::new`] to build one; it rejects addresses the API would
/// refuse anyway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: Vec<String>,
    #[serde(default)]
    pub city_locality: String,
    #[serde(default)]
    pub state_province: String,
    #[serde(default)]
    pub postal_code: String,
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_residential: Option<bool>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub company: String,
}

impl Address {
    /// Builds and validates an address.
    ///
    /// # Errors
    ///
    /// A [`Error::Validation`] when:
    /// * there are no street lines, or more than three;
    /// * `country_code` is not two ASCII letters;
    /// * the postal code is empty and the city or the state is missing;
    /// * the postal code has characters other than letters, digits, spaces and `-`.
    ///
    /// # Examples
    ///
    /// ```
    /// use shipengine::models::Address;
    ///
    /// let address = Address::new(
    ///     vec!["4 Jersey St".into()],
    ///     "Boston",
    ///     "MA",
    ///     "02215",
    ///     "US",
    /// )?;
    /// assert_eq!(address.country_code, "US");
    ///
    /// assert!(Address::new(vec![], "Boston", "MA", "02215", "US").is_err());
    /// # Ok::<(), shipengine::Error>(())
    /// ```
    pub fn new(
        street: Vec<String>,
        city_locality: impl Into<String>,
        state_province: impl Into<String>,
        postal_code: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Result<Self> {
        let address = Self {
            street,
            city_locality: city_locality.into(),
            state_province: state_province.into(),
            postal_code: postal_code.into(),
            country_code: country_code.into(),
            is_residential: None,
            name: String::new(),
            phone: String::new(),
            company: String::new(),
        };
        address.validate()?;
        Ok(address)
    }

    pub fn residential(mut self, is_residential: bool) -> Self {
        self.is_residential = Some(is_residential);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    /// Checks the rules enforced by [`Address::new`].
    pub fn validate(&self) -> Result<()> {
        if self.street.is_empty() {
            return Err(Error::validation(
                "Invalid address. At least one address line is required.",
                ErrorCode::FieldValueRequired,
            ));
        }
        if self.street.len() > 3 {
            return Err(Error::validation(
                "Invalid address. No more than 3 street lines are allowed.",
                ErrorCode::InvalidFieldValue,
            ));
        }

        if self.country_code.len() != 2
            || !self.country_code.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(Error::validation(
                format!(
                    "Invalid address: [{}] is not a valid country code.",
                    self.country_code
                ),
                ErrorCode::FieldValueRequired,
            ));
        }

        let postal_code = self.postal_code.trim();
        if postal_code.is_empty() {
            if self.city_locality.trim().is_empty() || self.state_province.trim().is_empty() {
                return Err(Error::validation(
                    MISSING_LOCALITY,
                    ErrorCode::FieldValueRequired,
                ));
            }
        } else if !postal_code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c.is_whitespace())
        {
            return Err(Error::validation(
                MISSING_LOCALITY,
                ErrorCode::FieldValueRequired,
            ));
        }

        Ok(())
    }
}

/// Result of `address.validate.v1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressValidateResult {
    #[serde(default)]
    pub is_valid: Option<bool>,
    #[serde(default)]
    pub normalized_address: Option<Address>,
    #[serde(default)]
    pub messages: Vec<Value>,
}

/// A carrier account connected to the ShipEngine account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierAccount {
    #[serde(rename = "carrierCode")]
    pub carrier_code: String,
    #[serde(rename = "accountID")]
    pub account_id: String,
    #[serde(rename = "accountNumber", default)]
    pub account_number: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CarrierAccountList {
    #[serde(rename = "carrierAccounts", default)]
    pub carrier_accounts: Vec<CarrierAccount>,
}

/// Identifies a package by carrier and tracking number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingQuery {
    pub carrier_code: String,
    pub tracking_number: String,
}

impl TrackingQuery {
    pub fn new(carrier_code: impl Into<String>, tracking_number: impl Into<String>) -> Self {
        Self {
            carrier_code: carrier_code.into(),
            tracking_number: tracking_number.into(),
        }
    }
}

/// What to track: a ShipEngine package id (`pkg_...`) or a carrier tracking number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageLookup {
    PackageId(String),
    Query(TrackingQuery),
}

impl PackageLookup {
    /// Builds the `package.track.v1` params, validating a package id first.
    pub(crate) fn to_params(&self) -> Result<Value> {
        match self {
            PackageLookup::PackageId(package_id) => {
                validate_package_id(package_id)?;
                Ok(json!({ "packageID": package_id }))
            }
            PackageLookup::Query(query) => serde_json::to_value(query)
                .map_err(|e| Error::system(format!("Failed to serialize the tracking query: {}", e))),
        }
    }
}

impl From<&str> for PackageLookup {
    fn from(package_id: &str) -> Self {
        PackageLookup::PackageId(package_id.to_string())
    }
}

impl From<String> for PackageLookup {
    fn from(package_id: String) -> Self {
        PackageLookup::PackageId(package_id)
    }
}

impl From<TrackingQuery> for PackageLookup {
    fn from(query: TrackingQuery) -> Self {
        PackageLookup::Query(query)
    }
}

fn validate_package_id(package_id: &str) -> Result<()> {
    let Some(rest) = package_id.strip_prefix("pkg_") else {
        let prefix: String = package_id.chars().take(4).collect();
        return Err(Error::validation(
            format!("[{}] is not a valid package ID prefix.", prefix),
            ErrorCode::InvalidIdentifier,
        ));
    };

    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_alphanumeric() && c != '0') {
        return Err(Error::validation(
            format!("[{}] is not a valid package ID.", package_id),
            ErrorCode::InvalidIdentifier,
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    #[serde(rename = "shipmentID", default)]
    pub shipment_id: Option<String>,
    #[serde(rename = "carrierAccountID", default)]
    pub carrier_account_id: Option<String>,
    #[serde(rename = "carrierCode", default)]
    pub carrier_code: Option<String>,
    #[serde(rename = "estimatedDelivery", default)]
    pub estimated_delivery: Option<String>,
    #[serde(rename = "actualDelivery", default)]
    pub actual_delivery: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    #[serde(rename = "packageID", default)]
    pub package_id: Option<String>,
    #[serde(rename = "trackingNumber", default)]
    pub tracking_number: Option<String>,
    #[serde(rename = "trackingURL", default)]
    pub tracking_url: Option<String>,
    #[serde(default)]
    pub weight: Option<Value>,
    #[serde(default)]
    pub dimensions: Option<Value>,
}

/// Result of `package.track.v1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPackageResult {
    #[serde(default)]
    pub shipment: Option<Shipment>,
    #[serde(default)]
    pub package: Option<Package>,
    #[serde(default)]
    pub events: Vec<Value>,
}

/// Decodes a call's `result` into `T`.
pub(crate) fn decode<T: DeserializeOwned>(method: &str, result: Value) -> Result<T> {
    serde_json::from_value(result).map_err(|e| {
        tracing::error!(error = %e, method = %method, "Failed to deserialize result");
        Error::system(format!(
            "Failed to decode the result of the ShipEngine {} API: {}",
            method, e
        ))
    })
}
