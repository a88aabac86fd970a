//! Coupons within a product family.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::client::ChargifyClient;
use crate::dispatch::Call;
use crate::endpoints::EndpointName;
use crate::error::ApiError;
use crate::query::comma_joined;
use crate::resources::{envelope, lenient_string, require};
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Decimal text such as `"12.5"`; absent for flat-amount coupons.
    #[serde(default, deserialize_with = "lenient_string")]
    pub percentage: Option<String>,
    #[serde(default)]
    pub amount_in_cents: Option<i64>,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub product_family_id: Option<i64>,
    #[serde(default)]
    pub end_date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub archived_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentageCoupon {
    pub name: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub percentage: f64,
    /// Whether the discount applies to every renewal or only the first charge.
    pub recurring: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatCoupon {
    pub name: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount_in_cents: i64,
    pub recurring: Option<bool>,
}

/// Coupon list filters. The `filter[...]` keys are sent as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CouponQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_prices: Option<bool>,
    #[serde(
        rename = "filter[codes]",
        default,
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "comma_joined"
    )]
    pub codes: Vec<String>,
    #[serde(
        rename = "filter[ids]",
        default,
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "comma_joined"
    )]
    pub ids: Vec<String>,
    #[serde(rename = "filter[date_field]", skip_serializing_if = "Option::is_none")]
    pub date_field: Option<String>,
    #[serde(rename = "filter[start_date]", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "filter[end_date]", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "filter[start_datetime]", skip_serializing_if = "Option::is_none")]
    pub start_datetime: Option<DateTime<FixedOffset>>,
    #[serde(rename = "filter[end_datetime]", skip_serializing_if = "Option::is_none")]
    pub end_datetime: Option<DateTime<FixedOffset>>,
}

/// A coupon body with the owning family's id added.
#[derive(Serialize)]
struct InFamily<'a, C> {
    #[serde(flatten)]
    coupon: &'a C,
    product_family_id: i64,
}

fn check_common(name: &str, code: &str, recurring: Option<bool>) -> Result<(), ApiError> {
    if name.trim().is_empty() || code.trim().is_empty() || recurring.is_none() {
        return Err(ApiError::InvalidInput(
            "name, code, and recurring are required".to_string(),
        ));
    }
    Ok(())
}

impl<T: Transport> ChargifyClient<T> {
    pub fn create_percentage_coupon(
        &self,
        family_id: i64,
        coupon: &PercentageCoupon,
    ) -> Result<Coupon, ApiError> {
        check_common(&coupon.name, &coupon.code, coupon.recurring)?;
        if coupon.percentage <= 0.0 {
            return Err(ApiError::InvalidInput(
                "a value greater than 0 must be included for percentage".to_string(),
            ));
        }
        self.create_coupon(family_id, coupon)
    }

    pub fn create_flat_coupon(&self, family_id: i64, coupon: &FlatCoupon) -> Result<Coupon, ApiError> {
        check_common(&coupon.name, &coupon.code, coupon.recurring)?;
        if coupon.amount_in_cents <= 0 {
            return Err(ApiError::InvalidInput(
                "a value greater than 0 must be included for amount_in_cents".to_string(),
            ));
        }
        self.create_coupon(family_id, coupon)
    }

    fn create_coupon<C: Serialize>(&self, family_id: i64, coupon: &C) -> Result<Coupon, ApiError> {
        let body = InFamily {
            coupon,
            product_family_id: family_id,
        };
        let call = Call::new(EndpointName::CouponCreate)
            .path("product_family_id", family_id)
            .body(&envelope("coupon", &body))?;
        self.call(call)?.field("coupon")
    }

    pub fn find_coupon(&self, family_id: i64, code: &str) -> Result<Coupon, ApiError> {
        require("coupon code", Some(code))?;
        let call = Call::new(EndpointName::CouponFind)
            .path("product_family_id", family_id)
            .path("code", code);
        self.call(call)?.field("coupon")
    }

    pub fn archive_coupon(&self, family_id: i64, coupon_id: i64) -> Result<(), ApiError> {
        let call = Call::new(EndpointName::CouponArchive)
            .path("product_family_id", family_id)
            .path("coupon_id", coupon_id);
        self.call(call)?.expect_success()?;
        Ok(())
    }

    pub fn list_coupons(&self, query: &CouponQuery) -> Result<Vec<Coupon>, ApiError> {
        self.call(Call::new(EndpointName::CouponsList).query(query)?)?
            .list("coupon")
    }
}
