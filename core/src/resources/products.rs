//! Product families, their products, and their metered components.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::client::ChargifyClient;
use crate::dispatch::Call;
use crate::endpoints::EndpointName;
use crate::error::ApiError;
use crate::resources::envelope;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductInterval {
    Month,
    Day,
    /// Only meaningful for expiration intervals.
    Never,
    /// Any unit this client does not know about yet.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductFamily {
    pub id: i64,
    pub name: String,
    pub handle: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form; the API stores it but never acts on it.
    #[serde(default)]
    pub accounting_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFamilyInput {
    pub name: String,
    pub handle: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounting_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub handle: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price_in_cents: i64,
    #[serde(default)]
    pub interval: Option<i64>,
    #[serde(default)]
    pub interval_unit: Option<ProductInterval>,
    #[serde(default)]
    pub initial_charge_in_cents: Option<i64>,
    #[serde(default)]
    pub trial_price_in_cents: Option<i64>,
    #[serde(default)]
    pub trial_interval: Option<i64>,
    #[serde(default)]
    pub trial_interval_unit: Option<ProductInterval>,
    #[serde(default)]
    pub expiration_interval: Option<i64>,
    #[serde(default)]
    pub expiration_interval_unit: Option<ProductInterval>,
    #[serde(default)]
    pub product_family: Option<ProductFamily>,
    #[serde(default)]
    pub version_number: Option<f64>,
    #[serde(default)]
    pub update_return_url: Option<String>,
    #[serde(default)]
    pub update_return_params: Option<String>,
    #[serde(default)]
    pub require_credit_card: bool,
    #[serde(default)]
    pub request_credit_card: bool,
    #[serde(default)]
    pub tax_code: Option<String>,
    #[serde(default)]
    pub public_signup_pages: Vec<SignupPage>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub archived_at: Option<DateTime<FixedOffset>>,
}

impl Product {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupPage {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub return_url: Option<String>,
    #[serde(default)]
    pub return_params: Option<String>,
}

/// Fields sent when creating or updating a product. `create_product` needs a
/// name, handle, description, positive price, and a billing interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_in_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_unit: Option<ProductInterval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_charge_in_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_price_in_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_interval: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_interval_unit: Option<ProductInterval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_interval: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_interval_unit: Option<ProductInterval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_credit_card: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_create_signup_page: Option<bool>,
    /// At most 10 characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_code: Option<String>,
}

impl ProductInput {
    fn validate_for_create(&self) -> Result<(), ApiError> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        if blank(&self.name) || blank(&self.handle) || blank(&self.description) {
            return Err(ApiError::InvalidInput(
                "name, handle, and description are required".to_string(),
            ));
        }
        if self.price_in_cents.unwrap_or(0) <= 0 {
            return Err(ApiError::InvalidInput(
                "price in cents must be greater than 0".to_string(),
            ));
        }
        if self.interval_unit.is_none() || self.interval.unwrap_or(0) == 0 {
            return Err(ApiError::InvalidInput(
                "interval and interval unit must be provided".to_string(),
            ));
        }
        Ok(())
    }
}

/// A metered, quantity-based, or on/off add-on within a product family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pricing_scheme: Option<String>,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub unit_price: Option<String>,
    #[serde(default)]
    pub product_family_id: Option<i64>,
    #[serde(default)]
    pub product_family_name: Option<String>,
    /// `metered_component`, `quantity_based_component`, `on_off_component`, ...
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub taxable: bool,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub default_price_point_id: Option<i64>,
    #[serde(default)]
    pub default_price_point_name: Option<String>,
    #[serde(default)]
    pub price_point_count: Option<i64>,
    #[serde(default)]
    pub price_points_url: Option<String>,
    #[serde(default)]
    pub upgrade_charge: Option<String>,
    #[serde(default)]
    pub downgrade_credit: Option<String>,
    #[serde(default)]
    pub allow_fractional_quantities: bool,
    #[serde(default)]
    pub prices: Vec<Price>,
    #[serde(default)]
    pub overage_prices: Vec<Price>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

/// One pricing tier of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub component_id: Option<i64>,
    pub starting_quantity: i64,
    #[serde(default)]
    pub ending_quantity: Option<i64>,
    pub unit_price: String,
    #[serde(default)]
    pub price_point_id: Option<i64>,
    #[serde(default)]
    pub formatted_unit_price: Option<String>,
}

impl<T: Transport> ChargifyClient<T> {
    pub fn create_product_family(&self, input: &ProductFamilyInput) -> Result<ProductFamily, ApiError> {
        if [&input.name, &input.handle, &input.description]
            .iter()
            .any(|s| s.trim().is_empty())
        {
            return Err(ApiError::InvalidInput(
                "name, handle, and description are all required".to_string(),
            ));
        }
        let call = Call::new(EndpointName::ProductFamilyCreate)
            .body(&envelope("product_family", input))?;
        self.call(call)?.field("product_family")
    }

    pub fn get_product_family(&self, id: i64) -> Result<ProductFamily, ApiError> {
        self.call(Call::new(EndpointName::ProductFamilyGet).path("id", id))?
            .field("product_family")
    }

    pub fn list_product_families(&self) -> Result<Vec<ProductFamily>, ApiError> {
        self.call(Call::new(EndpointName::ProductFamiliesGet))?
            .list("product_family")
    }

    pub fn list_product_family_products(&self, family_id: i64) -> Result<Vec<Product>, ApiError> {
        self.call(Call::new(EndpointName::ProductFamilyProductsGet).path("id", family_id))?
            .list("product")
    }

    pub fn list_product_family_components(&self, family_id: i64) -> Result<Vec<Component>, ApiError> {
        let call = Call::new(EndpointName::ProductFamilyComponentsGet)
            .path("product_family_id", family_id);
        self.call(call)?.list("component")
    }

    pub fn get_component_by_id(&self, family_id: i64, component_id: i64) -> Result<Component, ApiError> {
        let call = Call::new(EndpointName::ProductFamilyComponentByIdGet)
            .path("product_family_id", family_id)
            .path("component_id", component_id);
        self.call(call)?.field("component")
    }

    pub fn get_component_by_handle(&self, family_id: i64, handle: &str) -> Result<Component, ApiError> {
        let call = Call::new(EndpointName::ProductFamilyComponentByHandleGet)
            .path("product_family_id", family_id)
            .path("component_handle", handle);
        self.call(call)?.field("component")
    }

    pub fn create_product(&self, family_id: i64, input: &ProductInput) -> Result<Product, ApiError> {
        input.validate_for_create()?;
        let call = Call::new(EndpointName::ProductCreate)
            .path("product_family_id", family_id)
            .body(&envelope("product", input))?;
        self.call(call)?.field("product")
    }

    pub fn get_product(&self, id: i64) -> Result<Product, ApiError> {
        self.call(Call::new(EndpointName::ProductGetById).path("id", id))?
            .field("product")
    }

    pub fn get_product_by_handle(&self, handle: &str) -> Result<Product, ApiError> {
        self.call(Call::new(EndpointName::ProductGetByHandle).path("handle", handle))?
            .field("product")
    }

    pub fn update_product(&self, id: i64, input: &ProductInput) -> Result<Product, ApiError> {
        let call = Call::new(EndpointName::ProductUpdate)
            .path("id", id)
            .body(&envelope("product", input))?;
        self.call(call)?.field("product")
    }

    /// Archives a product. Existing subscriptions keep it; new ones can't
    /// be created against it.
    pub fn archive_product(&self, id: i64) -> Result<(), ApiError> {
        self.call(Call::new(EndpointName::ProductArchive).path("id", id))?.expect_success()?;
        Ok(())
    }
}
