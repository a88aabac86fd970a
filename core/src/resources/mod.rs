//! Typed resources and the client methods that read and write them.
//!
//! Each module pairs the DTOs for one area of the API with an
//! `impl ChargifyClient` block. Mappers wrap request bodies in the single-key
//! envelope the API expects and unwrap responses the same way.

pub mod billing_portal;
pub mod coupons;
pub mod customers;
pub mod events;
pub mod invoices;
pub mod metadata;
pub mod payment_profiles;
pub mod products;
pub mod subscriptions;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ApiError;

/// Sort order accepted by the list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl std::str::FromStr for Direction {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(ApiError::InvalidInput(format!(
                "direction must be asc or desc, not {other:?}"
            ))),
        }
    }
}

/// `{"<key>": value}`, the envelope every write endpoint expects.
pub(crate) fn envelope<'a, T: Serialize + ?Sized>(key: &'a str, value: &'a T) -> Envelope<'a, T> {
    Envelope { key, value }
}

pub(crate) struct Envelope<'a, T: ?Sized> {
    key: &'a str,
    value: &'a T,
}

impl<T: Serialize + ?Sized> Serialize for Envelope<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key, self.value)?;
        map.end()
    }
}

pub(crate) fn require(field: &str, value: Option<&str>) -> Result<(), ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ApiError::InvalidInput(format!("{field} is required"))),
    }
}

/// Accepts a string, number, or boolean and keeps its text. Several fields
/// come back as either `"10.0"` or `10` depending on the endpoint.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
