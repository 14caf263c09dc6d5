//! Identifier types for lead-meter.
//!
//! `ClientId` names a CRM sub-account as sent in the webhook body.
//! `BillingTarget` names where that client's usage accumulates on the
//! billing provider side.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A CRM client identifier, as carried in the `clientId` field.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Wrap a client identifier. Returns `None` for an empty string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Prefix Stripe uses for subscription item identifiers.
const SUBSCRIPTION_ITEM_PREFIX: &str = "si_";

/// Separator between a meter event name and the customer it bills.
pub const METER_CUSTOMER_SEPARATOR: char = ':';

/// A billing-provider target that accumulates usage for one client.
///
/// Mapping values starting with `si_` are subscription items. Anything else
/// must have the form `<event_name>:<customer>` and names a billing meter
/// plus the Stripe customer the meter event is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BillingTarget {
    /// A billing meter, addressed by its event name.
    Meter {
        /// Meter event name.
        event_name: String,
        /// Stripe customer the usage is billed to.
        customer: String,
    },
    /// A metered subscription line item.
    SubscriptionItem(String),
}

impl BillingTarget {
    /// Classify a raw mapping value.
    ///
    /// Returns `None` for an empty string or a meter value without both an
    /// event name and a customer.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        if raw.starts_with(SUBSCRIPTION_ITEM_PREFIX) {
            return Some(Self::SubscriptionItem(raw.to_string()));
        }

        let (event_name, customer) = raw.split_once(METER_CUSTOMER_SEPARATOR)?;
        if event_name.is_empty() || customer.is_empty() {
            return None;
        }
        Some(Self::Meter {
            event_name: event_name.to_string(),
            customer: customer.to_string(),
        })
    }

    /// The provider-side identifier usage is posted against: the subscription
    /// item id or the meter event name.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Meter { event_name, .. } => event_name,
            Self::SubscriptionItem(id) => id,
        }
    }

    /// Short label for log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Meter { .. } => "meter",
            Self::SubscriptionItem(_) => "subscription_item",
        }
    }
}

/// Renders the mapping value the target was parsed from.
impl fmt::Display for BillingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meter {
                event_name,
                customer,
            } => write!(f, "{event_name}{METER_CUSTOMER_SEPARATOR}{customer}"),
            Self::SubscriptionItem(id) => f.write_str(id),
        }
    }
}
