//! Premium entitlement bookkeeping driven by payment processor webhooks.
//!
//! Payloads reaching this module are expected to be signature-checked by the
//! webhook receiver already. Only three events are consumed:
//! - `checkout.session.completed`
//! - `customer.subscription.updated`
//! - `customer.subscription.deleted`

use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod event;
pub mod handler;

pub use event::BillingEvent;
pub use event::WebhookEvent;
pub use handler::handle_event;
pub use handler::handle_payload;
pub use handler::EventOutcome;

pub const MONTHLY_PLAN: &str = "monthly";
pub const YEARLY_PLAN: &str = "yearly";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    InvalidPayload(String),
    UserNotFound,
    Database(String),
}

impl BillingError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl fmt::Display for BillingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPayload(reason) => write!(f, "{}: {}", self.code(), reason),
            Self::UserNotFound => write!(f, "{}: no user matches the event", self.code()),
            Self::Database(reason) => write!(f, "{}: {}", self.code(), reason),
        }
    }
}

impl std::error::Error for BillingError {}

impl From<diesel::result::Error> for BillingError {
    fn from(error: diesel::result::Error) -> Self {
        BillingError::Database(format!("{error:?}"))
    }
}

impl From<serde_json::Error> for BillingError {
    fn from(error: serde_json::Error) -> Self {
        BillingError::InvalidPayload(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    Incomplete,
    IncompleteExpired,
    PastDue,
    Trialing,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "active" => Self::Active,
            "canceled" => Self::Canceled,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "past_due" => Self::PastDue,
            "trialing" => Self::Trialing,
            "unpaid" => Self::Unpaid,
            "paused" => Self::Paused,
            _ => Self::Incomplete,
        }
    }

    pub fn is_entitled(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

/// Price ids of the two sellable plans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plans {
    pub monthly_price_id: Option<String>,
    pub yearly_price_id: Option<String>,
}

impl Plans {
    pub fn from_config() -> Self {
        Plans {
            monthly_price_id: Config::stripe_price_monthly(),
            yearly_price_id: Config::stripe_price_yearly(),
        }
    }

    pub fn plan_for_price(&self, price_id: &str) -> Option<&'static str> {
        if self.monthly_price_id.as_deref() == Some(price_id) {
            Some(MONTHLY_PLAN)
        } else if self.yearly_price_id.as_deref() == Some(price_id) {
            Some(YEARLY_PLAN)
        } else {
            None
        }
    }

    pub fn plan_by_name(name: &str) -> Option<&'static str> {
        match name.trim().to_lowercase().as_str() {
            MONTHLY_PLAN => Some(MONTHLY_PLAN),
            YEARLY_PLAN => Some(YEARLY_PLAN),
            _ => None,
        }
    }
}
