use super::{BillingError, BillingEvent, Plans, WebhookEvent, MONTHLY_PLAN};
use crate::db::users::{self, SubscriptionActivation, SubscriptionUpdate};
use crate::models::user::User;
use diesel::connection::Connection;
use diesel::PgConnection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Activated { username: String },
    Updated { username: String, premium: bool },
    Deactivated { username: String },
    Ignored(String),
}

pub fn handle_payload(
    conn: &mut PgConnection,
    plans: &Plans,
    payload: &str,
) -> Result<EventOutcome, BillingError> {
    let event: WebhookEvent = serde_json::from_str(payload)?;

    handle_event(conn, plans, &event)
}

/// Applies one webhook event to the user it belongs to, in a single transaction.
pub fn handle_event(
    conn: &mut PgConnection,
    plans: &Plans,
    event: &WebhookEvent,
) -> Result<EventOutcome, BillingError> {
    let billing_event = BillingEvent::from_webhook(event, plans)?;

    let result = conn.transaction::<EventOutcome, BillingError, _>(|conn| {
        apply(conn, billing_event)
    });

    match &result {
        Ok(outcome) => log::info!(
            "Processed billing event {} ({}): {:?}",
            event.id,
            event.event_type,
            outcome
        ),
        Err(error) => log::error!(
            "Failed to process billing event {} ({}): {}",
            event.id,
            event.event_type,
            error
        ),
    }

    result
}

/// Only checkout links a subscription to a user. Update and deletion events
/// apply to the user whose current subscription they name, so a stale event
/// for a replaced or deleted subscription changes nothing.
fn apply(conn: &mut PgConnection, event: BillingEvent) -> Result<EventOutcome, BillingError> {
    match event {
        BillingEvent::CheckoutCompleted {
            customer_id,
            subscription_id,
            usernames,
            plan,
        } => {
            let user = usernames
                .iter()
                .find_map(|username| users::lock_by_username(conn, username))
                .or_else(|| users::lock_by_stripe_customer_id(conn, &customer_id))
                .ok_or(BillingError::UserNotFound)?;

            let activation = SubscriptionActivation {
                customer_id,
                subscription_id,
                plan: plan.unwrap_or(MONTHLY_PLAN).to_string(),
            };
            let user = users::activate_subscription(conn, &user, activation)?;

            Ok(EventOutcome::Activated {
                username: user.username,
            })
        }
        BillingEvent::SubscriptionUpdated {
            subscription_id,
            customer_id,
            status,
            cancel_at_period_end,
            plan,
        } => {
            let user = match users::lock_by_stripe_subscription_id(conn, &subscription_id) {
                Some(user) => user,
                None => return not_current(conn, &subscription_id, customer_id.as_deref()),
            };

            let premium = status.is_entitled();
            let update = SubscriptionUpdate {
                premium,
                cancel_at_period_end,
                plan: plan.map(str::to_string),
            };
            let user = users::update_subscription(conn, &user, update)?;

            Ok(EventOutcome::Updated {
                username: user.username,
                premium,
            })
        }
        BillingEvent::SubscriptionDeleted {
            subscription_id,
            customer_id,
        } => {
            let user = match users::lock_by_stripe_subscription_id(conn, &subscription_id) {
                Some(user) => user,
                None => return not_current(conn, &subscription_id, customer_id.as_deref()),
            };

            let user = users::deactivate_subscription(conn, &user)?;

            Ok(EventOutcome::Deactivated {
                username: user.username,
            })
        }
        BillingEvent::Ignored(reason) => Ok(EventOutcome::Ignored(reason)),
    }
}

fn not_current(
    conn: &mut PgConnection,
    subscription_id: &str,
    customer_id: Option<&str>,
) -> Result<EventOutcome, BillingError> {
    let user: User = customer_id
        .and_then(|customer_id| users::find_by_stripe_customer_id(conn, customer_id))
        .ok_or(BillingError::UserNotFound)?;

    Ok(EventOutcome::Ignored(format!(
        "{subscription_id} is not the current subscription of {}",
        user.username
    )))
}
