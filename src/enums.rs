//! Closed enumerations used in error payloads returned by ShipEngine API.
//!
//! The server sends these as plain strings. Parsing is strict: a value the
//! library does not know about is rejected with [`UnknownVariant`] instead of
//! being silently mapped to a catch-all.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Returned when a wire string is not a member of the expected enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{enumeration} must be a member of the {enumeration} enum - [{value}] provided.")]
pub struct UnknownVariant {
    /// Name of the enumeration that was being parsed.
    pub enumeration: &'static str,
    /// The value that failed to parse.
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every member of the enumeration, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The string used for this member on the wire.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        enumeration: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Where an error originated. Tells you whether to contact ShipEngine support
    /// or the carrier / marketplace instead.
    ErrorSource {
        /// The error is from ShipEngine.
        ShipEngine => "shipengine",
        /// The error came from a shipping carrier (UPS, FedEx, DHL, ...).
        Carrier => "carrier",
        /// The error came from an order source (Shopify, Ebay, ...).
        OrderSource => "order_source",
    }
}

wire_enum! {
    /// Broad category of an error.
    ErrorType {
        /// A problem with a ShipEngine or third-party account.
        AccountStatus => "account_status",
        /// Authentication or authorization failed.
        Security => "security",
        /// The input is missing a field or contains an illegal value.
        Validation => "validation",
        /// A business rule of ShipEngine, a carrier or an order source was violated.
        BusinessRules => "business_rules",
        /// Unknown or unexpected failure, including timeouts and rate limits.
        System => "system",
        /// General authorization error.
        Authorization => "authorization",
        /// Generic error.
        Error => "error",
    }
}

wire_enum! {
    /// Specific error code. Always more specific than [`ErrorType`].
    ErrorCode {
        AddressNotFound => "address_not_found",
        AutoFundNotSupported => "auto_fund_not_supported",
        BatchCannotBeModified => "batch_cannot_be_modified",
        CarrierConflict => "carrier_conflict",
        CarrierNotConnected => "carrier_not_connected",
        CarrierNotSupported => "carrier_not_supported",
        ConfirmationNotSupported => "confirmation_not_supported",
        FieldConflict => "field_conflict",
        FieldValueRequired => "field_value_required",
        Forbidden => "forbidden",
        IdentifierConflict => "identifier_conflict",
        IdentifiersMustMatch => "identifiers_must_match",
        IncompatiblePairedLabels => "incompatible_paired_labels",
        InvalidAddress => "invalid_address",
        InvalidBillingPlan => "invalid_billing_plan",
        InvalidChargeEvent => "invalid_charge_event",
        InvalidFieldValue => "invalid_field_value",
        InvalidIdentifier => "invalid_identifier",
        InvalidStatus => "invalid_status",
        InvalidStringLength => "invalid_string_length",
        LabelImagesNotSupported => "label_images_not_supported",
        MeterFailure => "meter_failure",
        MinimumPostalCodeVerificationFailed => "minimum_postal_code_verification_failed",
        NotFound => "not_found",
        PartiallyVerifiedToPremiseLevel => "partially_verified_to_premise_level",
        RateLimitExceeded => "rate_limit_exceeded",
        RequestBodyRequired => "request_body_required",
        ReturnLabelNotSupported => "return_label_not_supported",
        SubscriptionInactive => "subscription_inactive",
        TermsNotAccepted => "terms_not_accepted",
        Timeout => "timeout",
        TrackingNotSupported => "tracking_not_supported",
        TrialExpired => "trial_expired",
        Unauthorized => "unauthorized",
        Unspecified => "unspecified",
        VerificationFailure => "verification_failure",
        WarehouseConflict => "warehouse_conflict",
        WebhookEventTypeConflict => "webhook_event_type_conflict",
    }
}
