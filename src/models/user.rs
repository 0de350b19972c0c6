use crate::schema::users;
use chrono::{DateTime, Utc};

pub const DEFAULT_PLAN: &str = "monthly";

#[derive(Queryable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub name: String,
    pub trial_ends: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub subscription_plan: Option<String>,
    pub cancel_at_period_end: Option<bool>,
    pub premium: Option<bool>,
}

impl User {
    pub fn is_premium(&self) -> bool {
        self.premium.unwrap_or(false)
    }

    pub fn is_canceling(&self) -> bool {
        self.cancel_at_period_end.unwrap_or(false)
    }

    pub fn plan(&self) -> &str {
        self.subscription_plan.as_deref().unwrap_or(DEFAULT_PLAN)
    }

    /// Whole days remaining in the trial, never negative.
    pub fn trial_days_left(&self, now: DateTime<Utc>) -> i64 {
        match self.trial_ends {
            Some(trial_ends) => (trial_ends - now).num_days().max(0),
            None => 0,
        }
    }

    pub fn is_trialing(&self, now: DateTime<Utc>) -> bool {
        matches!(self.trial_ends, Some(trial_ends) if trial_ends > now)
    }

    pub fn has_access(&self, now: DateTime<Utc>) -> bool {
        self.is_premium() || self.is_trialing(now)
    }
}
