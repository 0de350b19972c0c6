use super::{BillingError, Plans, SubscriptionStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

pub const CONSUMED_EVENTS: &[&str] = &[CHECKOUT_COMPLETED, SUBSCRIPTION_UPDATED, SUBSCRIPTION_DELETED];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
    #[serde(default)]
    pub created: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    customer: Option<String>,
    subscription: Option<String>,
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    customer: Option<String>,
    status: Option<String>,
    #[serde(default)]
    cancel_at_period_end: bool,
    items: Option<SubscriptionItems>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItems {
    #[serde(default)]
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    price: Option<Price>,
}

#[derive(Debug, Deserialize)]
struct Price {
    id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutCompleted {
        customer_id: String,
        subscription_id: String,
        /// Candidate usernames, most specific first.
        usernames: Vec<String>,
        plan: Option<&'static str>,
    },
    SubscriptionUpdated {
        subscription_id: String,
        customer_id: Option<String>,
        status: SubscriptionStatus,
        cancel_at_period_end: bool,
        plan: Option<&'static str>,
    },
    SubscriptionDeleted {
        subscription_id: String,
        customer_id: Option<String>,
    },
    Ignored(String),
}

impl BillingEvent {
    pub fn from_webhook(event: &WebhookEvent, plans: &Plans) -> Result<Self, BillingError> {
        match event.event_type.as_str() {
            CHECKOUT_COMPLETED => Self::checkout_completed(event),
            SUBSCRIPTION_UPDATED => {
                let object = Self::subscription_object(event)?;
                let plan = object
                    .items
                    .iter()
                    .flat_map(|items| items.data.iter())
                    .filter_map(|item| item.price.as_ref())
                    .find_map(|price| plans.plan_for_price(&price.id));

                Ok(BillingEvent::SubscriptionUpdated {
                    subscription_id: object.id,
                    customer_id: object.customer,
                    status: SubscriptionStatus::parse(object.status.as_deref().unwrap_or_default()),
                    cancel_at_period_end: object.cancel_at_period_end,
                    plan,
                })
            }
            SUBSCRIPTION_DELETED => {
                let object = Self::subscription_object(event)?;

                Ok(BillingEvent::SubscriptionDeleted {
                    subscription_id: object.id,
                    customer_id: object.customer,
                })
            }
            other => Ok(BillingEvent::Ignored(format!("unsupported event {other}"))),
        }
    }

    fn checkout_completed(event: &WebhookEvent) -> Result<Self, BillingError> {
        let object: CheckoutSessionObject = serde_json::from_value(event.data.object.clone())?;

        let subscription_id = match object.subscription {
            Some(subscription_id) => subscription_id,
            None => {
                return Ok(BillingEvent::Ignored(
                    "checkout session without subscription".to_string(),
                ))
            }
        };

        let customer_id = object.customer.ok_or_else(|| {
            BillingError::InvalidPayload("checkout session without customer".to_string())
        })?;

        let mut usernames: Vec<String> = Vec::new();

        for candidate in [
            object.client_reference_id.as_deref(),
            object.metadata.get("username").map(String::as_str),
        ]
        .into_iter()
        .flatten()
        {
            let candidate = candidate.trim();

            if !candidate.is_empty() && !usernames.iter().any(|username| username == candidate) {
                usernames.push(candidate.to_string());
            }
        }

        let plan = object
            .metadata
            .get("plan")
            .and_then(|plan| Plans::plan_by_name(plan));

        Ok(BillingEvent::CheckoutCompleted {
            customer_id,
            subscription_id,
            usernames,
            plan,
        })
    }

    fn subscription_object(event: &WebhookEvent) -> Result<SubscriptionObject, BillingError> {
        Ok(serde_json::from_value(event.data.object.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plans() -> Plans {
        Plans {
            monthly_price_id: Some("price_monthly".to_string()),
            yearly_price_id: Some("price_yearly".to_string()),
        }
    }

    fn webhook(event_type: &str, object: serde_json::Value) -> WebhookEvent {
        WebhookEvent {
            id: "evt_1".to_string(),
            event_type: event_type.to_string(),
            data: WebhookEventData { object },
            created: 1_614_556_800,
        }
    }

    #[test]
    fn webhook_event_deserializes_type_field() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"id":"evt_1","type":"customer.subscription.deleted","data":{"object":{"id":"sub_1"}}}"#,
        )
        .unwrap();

        assert_eq!(event.event_type, SUBSCRIPTION_DELETED);
        assert_eq!(event.created, 0);
    }

    #[test]
    fn parses_checkout_completed() {
        let event = webhook(
            CHECKOUT_COMPLETED,
            json!({
                "id": "cs_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "client_reference_id": "trader",
                "metadata": {"plan": "yearly"}
            }),
        );

        assert_eq!(
            BillingEvent::from_webhook(&event, &plans()).unwrap(),
            BillingEvent::CheckoutCompleted {
                customer_id: "cus_1".to_string(),
                subscription_id: "sub_1".to_string(),
                usernames: vec!["trader".to_string()],
                plan: Some("yearly"),
            }
        );
    }

    #[test]
    fn checkout_falls_back_to_metadata_username() {
        let event = webhook(
            CHECKOUT_COMPLETED,
            json!({
                "customer": "cus_1",
                "subscription": "sub_1",
                "client_reference_id": null,
                "metadata": {"username": "trader"}
            }),
        );

        match BillingEvent::from_webhook(&event, &plans()).unwrap() {
            BillingEvent::CheckoutCompleted { usernames, plan, .. } => {
                assert_eq!(usernames, vec!["trader".to_string()]);
                assert_eq!(plan, None);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn checkout_keeps_both_username_candidates_in_order() {
        let event = webhook(
            CHECKOUT_COMPLETED,
            json!({
                "customer": "cus_1",
                "subscription": "sub_1",
                "client_reference_id": " ghost ",
                "metadata": {"username": "trader"}
            }),
        );

        match BillingEvent::from_webhook(&event, &plans()).unwrap() {
            BillingEvent::CheckoutCompleted { usernames, .. } => {
                assert_eq!(usernames, vec!["ghost".to_string(), "trader".to_string()]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn checkout_without_username_has_no_candidates() {
        let event = webhook(
            CHECKOUT_COMPLETED,
            json!({
                "customer": "cus_1",
                "subscription": "sub_1",
                "client_reference_id": "",
                "metadata": {"username": "  "}
            }),
        );

        match BillingEvent::from_webhook(&event, &plans()).unwrap() {
            BillingEvent::CheckoutCompleted { usernames, .. } => assert!(usernames.is_empty()),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn checkout_without_subscription_is_ignored() {
        let event = webhook(CHECKOUT_COMPLETED, json!({"customer": "cus_1", "mode": "payment"}));

        assert!(matches!(
            BillingEvent::from_webhook(&event, &plans()).unwrap(),
            BillingEvent::Ignored(_)
        ));
    }

    #[test]
    fn checkout_without_customer_is_invalid() {
        let event = webhook(CHECKOUT_COMPLETED, json!({"subscription": "sub_1"}));

        assert_eq!(
            BillingEvent::from_webhook(&event, &plans()).unwrap_err().code(),
            "INVALID_PAYLOAD"
        );
    }

    #[test]
    fn parses_subscription_updated() {
        let event = webhook(
            SUBSCRIPTION_UPDATED,
            json!({
                "id": "sub_1",
                "customer": "cus_1",
                "status": "active",
                "cancel_at_period_end": true,
                "items": {"data": [{"price": {"id": "price_yearly"}}]}
            }),
        );

        assert_eq!(
            BillingEvent::from_webhook(&event, &plans()).unwrap(),
            BillingEvent::SubscriptionUpdated {
                subscription_id: "sub_1".to_string(),
                customer_id: Some("cus_1".to_string()),
                status: SubscriptionStatus::Active,
                cancel_at_period_end: true,
                plan: Some("yearly"),
            }
        );
    }

    #[test]
    fn subscription_update_with_unknown_price_has_no_plan() {
        let event = webhook(
            SUBSCRIPTION_UPDATED,
            json!({
                "id": "sub_1",
                "status": "past_due",
                "items": {"data": [{"price": {"id": "price_legacy"}}]}
            }),
        );

        match BillingEvent::from_webhook(&event, &plans()).unwrap() {
            BillingEvent::SubscriptionUpdated {
                plan,
                status,
                cancel_at_period_end,
                customer_id,
                ..
            } => {
                assert_eq!(plan, None);
                assert_eq!(status, SubscriptionStatus::PastDue);
                assert!(!cancel_at_period_end);
                assert_eq!(customer_id, None);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn parses_subscription_deleted() {
        let event = webhook(
            SUBSCRIPTION_DELETED,
            json!({"id": "sub_1", "customer": "cus_1", "status": "canceled"}),
        );

        assert_eq!(
            BillingEvent::from_webhook(&event, &plans()).unwrap(),
            BillingEvent::SubscriptionDeleted {
                subscription_id: "sub_1".to_string(),
                customer_id: Some("cus_1".to_string()),
            }
        );
    }

    #[test]
    fn subscription_event_without_id_is_invalid() {
        let event = webhook(SUBSCRIPTION_DELETED, json!({"customer": "cus_1"}));

        assert!(matches!(
            BillingEvent::from_webhook(&event, &plans()),
            Err(BillingError::InvalidPayload(_))
        ));
    }

    #[test]
    fn other_events_are_ignored() {
        let event = webhook("invoice.paid", json!({"id": "in_1"}));

        assert_eq!(
            BillingEvent::from_webhook(&event, &plans()).unwrap(),
            BillingEvent::Ignored("unsupported event invoice.paid".to_string())
        );
        assert!(!CONSUMED_EVENTS.contains(&"invoice.paid"));
    }
}
