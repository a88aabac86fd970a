//! Subscriptions and everything hanging off one: cancellation, migration,
//! components, metered usage, metadata, refunds, and purging.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::ChargifyClient;
use crate::dispatch::Call;
use crate::endpoints::EndpointName;
use crate::error::ApiError;
use crate::resources::customers::{Customer, CustomerInput};
use crate::resources::events::{Event, EventQuery};
use crate::resources::invoices::Refund;
use crate::resources::metadata::MetaData;
use crate::resources::payment_profiles::PaymentProfile;
use crate::resources::products::Product;
use crate::resources::{envelope, lenient_string, require, Direction};
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    /// `trialing`, `active`, `past_due`, `canceled`, `expired`, ...
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub balance_in_cents: Option<i64>,
    #[serde(default)]
    pub total_revenue_in_cents: Option<i64>,
    #[serde(default)]
    pub product_price_in_cents: Option<i64>,
    #[serde(default)]
    pub current_period_started_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub current_period_ends_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub next_assessment_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub trial_started_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub trial_ended_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub activated_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub canceled_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub delayed_cancel_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub cancel_at_end_of_period: Option<bool>,
    #[serde(default)]
    pub cancellation_message: Option<String>,
    #[serde(default)]
    pub cancellation_method: Option<String>,
    #[serde(default)]
    pub reason_code: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    /// `automatic` or `remittance`.
    #[serde(default)]
    pub payment_collection_method: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub snap_day: Option<String>,
    #[serde(default)]
    pub receives_invoice_emails: Option<bool>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub product: Option<Product>,
    #[serde(default)]
    pub credit_card: Option<PaymentProfile>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

/// A new subscription. Identify the customer by id, by reference, or by
/// attributes for a customer created on the fly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateSubscription {
    pub product_handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_attributes: Option<CustomerInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_profile_id: Option<i64>,
    /// A future date skips trial and initial charges; the first payment is
    /// taken around this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_billing_at: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_tracks_next_billing_change: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_collection_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement_terms: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizer_first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizer_last_name: Option<String>,
    /// 1 to 28, or `end`. Not allowed together with `next_billing_at`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_day: Option<String>,
    /// `prorated`, `immediate`, or `delayed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_billing_first_charge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receives_invoice_emails: Option<bool>,
}

impl CreateSubscription {
    pub fn for_customer(customer_id: i64, product_handle: &str) -> Self {
        Self {
            product_handle: product_handle.to_string(),
            customer_id: Some(customer_id),
            ..Self::default()
        }
    }

    pub fn for_reference(customer_reference: &str, product_handle: &str) -> Self {
        Self {
            product_handle: product_handle.to_string(),
            customer_reference: Some(customer_reference.to_string()),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ApiError> {
        require("product handle", Some(self.product_handle.as_str()))?;
        if self.customer_id.is_none()
            && self.customer_reference.is_none()
            && self.customer_attributes.is_none()
        {
            return Err(ApiError::InvalidInput(
                "a customer id, reference, or attributes are required".to_string(),
            ));
        }
        if self.next_billing_at.is_some() && self.snap_day.is_some() {
            return Err(ApiError::InvalidInput(
                "snap day cannot be combined with next billing at".to_string(),
            ));
        }
        Ok(())
    }
}

/// How to cancel a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cancellation {
    /// Cancel now.
    Immediately,
    /// Cancel at the end of the current period. The reason is only recorded
    /// when both the code and the message are given.
    Delayed {
        reason_code: Option<String>,
        message: Option<String>,
    },
}

#[derive(Serialize)]
struct CancellationReason<'a> {
    cancellation_message: &'a str,
    reason_code: &'a str,
}

/// Moves a subscription to another product, optionally carrying over its
/// trial, initial charge, coupons, and current period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    pub product_handle: String,
    pub include_trial: bool,
    pub include_initial_charge: bool,
    pub include_coupons: bool,
    pub preserve_period: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionComponent {
    pub component_id: i64,
    pub subscription_id: i64,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub pricing_scheme: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub allocated_quantity: Option<String>,
    #[serde(default)]
    pub unit_balance: Option<i64>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub price_point_id: Option<i64>,
    #[serde(default)]
    pub price_point_handle: Option<String>,
    #[serde(default)]
    pub price_point_type: Option<String>,
    #[serde(default)]
    pub price_point_name: Option<String>,
    #[serde(default)]
    pub component_handle: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub archived_at: Option<DateTime<FixedOffset>>,
}

/// A refund of one payment made against a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRefund {
    pub payment_id: i64,
    /// Decimal amount in the site currency, e.g. `"10.50"`.
    pub amount: String,
    pub memo: String,
}

/// Filters for listing subscriptions. Unset fields are left off the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_price_point_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_datetime: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_datetime: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

/// Metered usage recorded against a component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_point_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// A usage record as stored by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quantity: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub component_id: Option<i64>,
    #[serde(default)]
    pub component_handle: Option<String>,
    #[serde(default)]
    pub subscription_id: Option<i64>,
    #[serde(default)]
    pub price_point_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
}

#[derive(Serialize)]
struct ProductChange<'a> {
    product_handle: &'a str,
}

impl<T: Transport> ChargifyClient<T> {
    pub fn create_subscription(&self, input: &CreateSubscription) -> Result<Subscription, ApiError> {
        input.validate()?;
        let call = Call::new(EndpointName::SubscriptionCreate)
            .body(&envelope("subscription", input))?;
        self.call(call)?.field("subscription")
    }

    pub fn get_subscription(&self, id: i64) -> Result<Subscription, ApiError> {
        self.call(Call::new(EndpointName::SubscriptionGet).path("subscription_id", id))?
            .field("subscription")
    }

    /// Switches the subscription to the product with `product_handle`.
    pub fn update_subscription_product(
        &self,
        id: i64,
        product_handle: &str,
    ) -> Result<Subscription, ApiError> {
        require("product handle", Some(product_handle))?;
        let call = Call::new(EndpointName::SubscriptionUpdate)
            .path("subscription_id", id)
            .body(&envelope("subscription", &ProductChange { product_handle }))?;
        self.call(call)?.field("subscription")
    }

    pub fn cancel_subscription(&self, id: i64, cancellation: Cancellation) -> Result<(), ApiError> {
        let call = match &cancellation {
            Cancellation::Immediately => {
                Call::new(EndpointName::SubscriptionCancelImmediately).path("subscription_id", id)
            }
            Cancellation::Delayed {
                reason_code,
                message,
            } => {
                let call = Call::new(EndpointName::SubscriptionCancelDelayed)
                    .path("subscription_id", id);
                match (reason_code.as_deref(), message.as_deref()) {
                    (Some(reason_code), Some(cancellation_message)) => call.body(&CancellationReason {
                        cancellation_message,
                        reason_code,
                    })?,
                    _ => call,
                }
            }
        };
        self.call(call)?.expect_success()?;
        info!(subscription_id = id, ?cancellation, "subscription cancellation requested");
        Ok(())
    }

    pub fn remove_delayed_cancellation(&self, id: i64) -> Result<(), ApiError> {
        let call = Call::new(EndpointName::SubscriptionRemoveDelayedCancel).path("subscription_id", id);
        self.call(call)?.expect_success()?;
        Ok(())
    }

    pub fn migrate_subscription(&self, id: i64, migration: &Migration) -> Result<Subscription, ApiError> {
        require("product handle", Some(migration.product_handle.as_str()))?;
        let call = Call::new(EndpointName::SubscriptionMigrate)
            .path("subscription_id", id)
            .body(&envelope("migration", migration))?;
        self.call(call)?.field("subscription")
    }

    pub fn list_subscription_components(&self, id: i64) -> Result<Vec<SubscriptionComponent>, ApiError> {
        let call = Call::new(EndpointName::SubscriptionComponentsList).path("subscription_id", id);
        self.call(call)?.list("component")
    }

    pub fn get_subscription_metadata(&self, id: i64) -> Result<MetaData, ApiError> {
        let call = Call::new(EndpointName::SubscriptionGetMetaData).path("subscription_id", id);
        self.call(call)?.decode()
    }

    pub fn refund_subscription_payment(&self, id: i64, refund: &PaymentRefund) -> Result<Refund, ApiError> {
        require("amount", Some(refund.amount.as_str()))?;
        require("memo", Some(refund.memo.as_str()))?;
        let call = Call::new(EndpointName::SubscriptionRefund)
            .path("subscription_id", id)
            .body(&envelope("refund", refund))?;
        self.call(call)?.field("refund")
    }

    pub fn list_subscription_events(&self, id: i64, query: &EventQuery) -> Result<Vec<Event>, ApiError> {
        let call = Call::new(EndpointName::SubscriptionEvents)
            .path("subscription_id", id)
            .query(query)?;
        self.call(call)?.list("event")
    }

    /// Deletes a subscription and all of its history. Only allowed on test
    /// sites. `customer_id` must be the subscription's owner; the API uses it
    /// as an acknowledgement. Cascading also removes the customer and/or the
    /// payment profile.
    pub fn purge_subscription(
        &self,
        id: i64,
        customer_id: i64,
        cascade_customer: bool,
        cascade_payment_profile: bool,
    ) -> Result<(), ApiError> {
        let mut call = Call::new(EndpointName::SubscriptionPurge)
            .path("subscription_id", id)
            .query_pair("ack", customer_id);
        if cascade_customer {
            call = call.query_pair("cascade[]", "customer");
        }
        if cascade_payment_profile {
            call = call.query_pair("cascade[]", "payment_profile");
        }
        self.call(call)?.expect_status(200)?;
        info!(subscription_id = id, customer_id, "subscription purged");
        Ok(())
    }

    pub fn list_subscriptions(&self, query: &SubscriptionQuery) -> Result<Vec<Subscription>, ApiError> {
        self.call(Call::new(EndpointName::SubscriptionsList).query(query)?)?
            .list("subscription")
    }

    /// Records metered usage for one component of a subscription.
    pub fn record_component_usage(
        &self,
        subscription_id: i64,
        component_id: i64,
        usage: &Usage,
    ) -> Result<UsageRecord, ApiError> {
        if usage.quantity < 0.0 {
            return Err(ApiError::InvalidInput(
                "usage quantity cannot be negative".to_string(),
            ));
        }
        let call = Call::new(EndpointName::SubscriptionComponentsUsages)
            .path("subscription_id", subscription_id)
            .path("component_id", component_id)
            .body(&envelope("usage", usage))?;
        self.call(call)?.field("usage")
    }
}
