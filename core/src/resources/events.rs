//! Site events and the usage-event ingestion API.
//!
//! Listing and counting go to the site root. Ingestion goes to the separate
//! events host configured as `Config::events_url`, keyed by the API handle of
//! the event-based billing stream.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ChargifyClient;
use crate::dispatch::Call;
use crate::endpoints::EndpointName;
use crate::error::ApiError;
use crate::query::comma_joined;
use crate::resources::{lenient_string, require, Direction};
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    /// Event type, e.g. `signup_success` or `component_allocation_change`.
    pub key: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub subscription_id: Option<i64>,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    /// Shape depends on `key`; see [`Event::usage_details`].
    #[serde(default)]
    pub event_specific_data: Value,
}

impl Event {
    /// Decodes `event_specific_data` for usage and allocation events.
    /// `None` when the payload carries none of the usage fields.
    pub fn usage_details(&self) -> Option<EventSpecificData> {
        EventSpecificData::deserialize(&self.event_specific_data)
            .ok()
            .filter(|details| *details != EventSpecificData::default())
    }
}

/// The usage-related fields of `event_specific_data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSpecificData {
    #[serde(deserialize_with = "lenient_string")]
    pub previous_unit_balance: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub previous_overage_unit_balance: Option<String>,
    pub new_unit_balance: Option<i64>,
    pub new_overage_unit_balance: Option<i64>,
    pub usage_quantity: Option<i64>,
    pub overage_usage_quantity: Option<i64>,
    pub component_id: Option<i64>,
    pub component_handle: Option<String>,
    pub memo: Option<String>,
    pub allocation_details: Vec<AllocationDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationDetail {
    pub allocation_id: i64,
    #[serde(default)]
    pub charge_id: Option<i64>,
    #[serde(default)]
    pub usage_quantity: i64,
}

/// Filters for event listings. Unset fields are left off the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Event keys to include, sent comma-separated.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "comma_joined"
    )]
    pub filter: Vec<String>,
    /// `created_at` or `updated_at`, the field the date bounds apply to.
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
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCountQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "comma_joined"
    )]
    pub filter: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCount {
    #[serde(default)]
    pub count: u64,
}

impl<T: Transport> ChargifyClient<T> {
    pub fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>, ApiError> {
        self.call(Call::new(EndpointName::Events).query(query)?)?
            .list("event")
    }

    pub fn count_events(&self, query: &EventCountQuery) -> Result<EventCount, ApiError> {
        self.call(Call::new(EndpointName::EventsCount).query(query)?)?
            .decode()
    }

    /// Sends one usage event to the stream identified by `api_handle`.
    /// `store_uid` selects the event store when a site has several.
    pub fn ingest_event<B: Serialize + ?Sized>(
        &self,
        api_handle: &str,
        event: &B,
        store_uid: Option<&str>,
    ) -> Result<(), ApiError> {
        require("api handle", Some(api_handle))?;
        let call = with_store(
            Call::new(EndpointName::EventsIngestion).path("api_handle", api_handle),
            store_uid,
        )
        .body(event)?;
        self.call(call)?.expect_success()?;
        Ok(())
    }

    /// Sends a batch of usage events in one request.
    pub fn ingest_events_bulk<B: Serialize>(
        &self,
        api_handle: &str,
        events: &[B],
        store_uid: Option<&str>,
    ) -> Result<(), ApiError> {
        require("api handle", Some(api_handle))?;
        if events.is_empty() {
            return Err(ApiError::InvalidInput("no events to ingest".to_string()));
        }
        let call = with_store(
            Call::new(EndpointName::EventsBulkIngestion).path("api_handle", api_handle),
            store_uid,
        )
        .body(events)?;
        self.call(call)?.expect_success()?;
        Ok(())
    }
}

fn with_store(call: Call, store_uid: Option<&str>) -> Call {
    match store_uid {
        Some(uid) => call.query_pair("store_uid", uid),
        None => call,
    }
}
