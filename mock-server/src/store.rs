//! In-memory records and the request shapes the mock accepts.
//!
//! Records are stored by id in `BTreeMap`s so listings come back in id
//! order. Subscriptions keep only the ids of their customer and product and
//! are joined back together when rendered.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub cc_emails: Option<String>,
    pub organization: Option<String>,
    pub reference: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub portal_customer_created_at: Option<DateTime<Utc>>,
    pub portal_invite_last_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [
            Some(&self.first_name),
            Some(&self.last_name),
            Some(&self.email),
            self.organization.as_ref(),
            self.reference.as_ref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Customer fields as sent by clients. Everything is optional so a partial
/// update deserializes; creation checks the required ones.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CustomerFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub cc_emails: Option<String>,
    pub organization: Option<String>,
    pub reference: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProductFamily {
    pub id: i64,
    pub name: String,
    pub handle: String,
    pub description: Option<String>,
    pub accounting_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductFamilyFields {
    pub name: Option<String>,
    pub handle: Option<String>,
    pub description: Option<String>,
    pub accounting_code: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub handle: String,
    pub description: Option<String>,
    pub price_in_cents: i64,
    pub interval: i64,
    pub interval_unit: String,
    pub trial_price_in_cents: Option<i64>,
    pub trial_interval: Option<i64>,
    pub trial_interval_unit: Option<String>,
    pub product_family: ProductFamily,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductFields {
    pub name: Option<String>,
    pub handle: Option<String>,
    pub description: Option<String>,
    pub price_in_cents: Option<i64>,
    pub interval: Option<i64>,
    pub interval_unit: Option<String>,
    pub trial_price_in_cents: Option<i64>,
    pub trial_interval: Option<i64>,
    pub trial_interval_unit: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubscriptionRecord {
    pub id: i64,
    pub state: String,
    pub customer_id: i64,
    pub product_id: i64,
    pub coupon_code: Option<String>,
    pub current_period_started_at: DateTime<Utc>,
    pub current_period_ends_at: DateTime<Utc>,
    pub trial_ended_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub delayed_cancel_at: Option<DateTime<Utc>>,
    pub cancellation_message: Option<String>,
    pub reason_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A subscription with its customer and product embedded, as the API
/// returns it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: i64,
    pub state: String,
    pub balance_in_cents: i64,
    pub coupon_code: Option<String>,
    pub payment_collection_method: String,
    pub current_period_started_at: DateTime<Utc>,
    pub current_period_ends_at: DateTime<Utc>,
    pub next_assessment_at: DateTime<Utc>,
    pub trial_ended_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub delayed_cancel_at: Option<DateTime<Utc>>,
    pub cancel_at_end_of_period: bool,
    pub cancellation_message: Option<String>,
    pub reason_code: Option<String>,
    pub customer: Customer,
    pub product: Product,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubscriptionFields {
    pub product_handle: Option<String>,
    pub product_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub customer_reference: Option<String>,
    pub customer_attributes: Option<CustomerFields>,
    pub coupon_code: Option<String>,
    pub next_billing_at: Option<DateTime<Utc>>,
}

/// Everything the mock knows. One id sequence is shared by all resources.
#[derive(Debug, Default)]
pub struct Store {
    next_id: i64,
    pub customers: BTreeMap<i64, Customer>,
    pub families: BTreeMap<i64, ProductFamily>,
    pub products: BTreeMap<i64, Product>,
    pub subscriptions: BTreeMap<i64, SubscriptionRecord>,
    /// Management-link fetches per customer since the portal was enabled.
    pub portal_fetches: BTreeMap<i64, i64>,
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn reference_taken(&self, reference: &str, except: Option<i64>) -> bool {
        self.customers
            .values()
            .any(|c| c.reference.as_deref() == Some(reference) && Some(c.id) != except)
    }

    pub fn create_customer(&mut self, fields: CustomerFields) -> Result<Customer, Vec<String>> {
        let mut errors = Vec::new();
        if blank(&fields.first_name) {
            errors.push("First name: cannot be blank.".to_string());
        }
        if blank(&fields.last_name) {
            errors.push("Last name: cannot be blank.".to_string());
        }
        if blank(&fields.email) {
            errors.push("Email address: cannot be blank.".to_string());
        }
        if let Some(reference) = fields.reference.as_deref() {
            if self.reference_taken(reference, None) {
                errors.push("Reference: must be unique - that value has been taken.".to_string());
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let now = Utc::now();
        let customer = Customer {
            id: self.next_id(),
            first_name: fields.first_name.unwrap_or_default(),
            last_name: fields.last_name.unwrap_or_default(),
            email: fields.email.unwrap_or_default(),
            cc_emails: fields.cc_emails,
            organization: fields.organization,
            reference: fields.reference,
            phone: fields.phone,
            address: fields.address,
            city: fields.city,
            state: fields.state,
            zip: fields.zip,
            country: fields.country,
            portal_customer_created_at: None,
            portal_invite_last_sent_at: None,
            created_at: now,
            updated_at: now,
        };
        self.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    /// `Ok(None)` when the customer does not exist.
    pub fn update_customer(
        &mut self,
        id: i64,
        fields: CustomerFields,
    ) -> Result<Option<Customer>, Vec<String>> {
        if let Some(reference) = fields.reference.as_deref() {
            if self.reference_taken(reference, Some(id)) {
                return Err(vec![
                    "Reference: must be unique - that value has been taken.".to_string()
                ]);
            }
        }
        if matches!(&fields.email, Some(email) if email.trim().is_empty()) {
            return Err(vec!["Email address: cannot be blank.".to_string()]);
        }
        let Some(customer) = self.customers.get_mut(&id) else {
            return Ok(None);
        };
        let CustomerFields {
            first_name,
            last_name,
            email,
            cc_emails,
            organization,
            reference,
            phone,
            address,
            city,
            state,
            zip,
            country,
        } = fields;
        if let Some(v) = first_name {
            customer.first_name = v;
        }
        if let Some(v) = last_name {
            customer.last_name = v;
        }
        if let Some(v) = email {
            customer.email = v;
        }
        for (slot, value) in [
            (&mut customer.cc_emails, cc_emails),
            (&mut customer.organization, organization),
            (&mut customer.reference, reference),
            (&mut customer.phone, phone),
            (&mut customer.address, address),
            (&mut customer.city, city),
            (&mut customer.state, state),
            (&mut customer.zip, zip),
            (&mut customer.country, country),
        ] {
            if value.is_some() {
                *slot = value;
            }
        }
        customer.updated_at = Utc::now();
        Ok(Some(customer.clone()))
    }

    pub fn search_customers(&self, query: Option<&str>) -> Vec<Customer> {
        self.customers
            .values()
            .filter(|c| query.map_or(true, |q| c.matches(q)))
            .cloned()
            .collect()
    }

    pub fn customer_by_reference(&self, reference: &str) -> Option<Customer> {
        self.customers
            .values()
            .find(|c| c.reference.as_deref() == Some(reference))
            .cloned()
    }

    pub fn create_family(&mut self, fields: ProductFamilyFields) -> Result<ProductFamily, Vec<String>> {
        if blank(&fields.name) {
            return Err(vec!["Name: cannot be blank.".to_string()]);
        }
        let handle = fields
            .handle
            .filter(|h| !h.trim().is_empty())
            .or_else(|| fields.name.as_deref().map(to_handle))
            .unwrap_or_default();
        if self.families.values().any(|f| f.handle == handle) {
            return Err(vec!["API Handle: must be unique - that value has been taken.".to_string()]);
        }
        let now = Utc::now();
        let family = ProductFamily {
            id: self.next_id(),
            name: fields.name.unwrap_or_default(),
            handle,
            description: fields.description,
            accounting_code: fields.accounting_code,
            created_at: now,
            updated_at: now,
        };
        self.families.insert(family.id, family.clone());
        Ok(family)
    }

    /// `Ok(None)` when the family does not exist.
    pub fn create_product(
        &mut self,
        family_id: i64,
        fields: ProductFields,
    ) -> Result<Option<Product>, Vec<String>> {
        let Some(family) = self.families.get(&family_id).cloned() else {
            return Ok(None);
        };
        let mut errors = Vec::new();
        if blank(&fields.name) {
            errors.push("Name: cannot be blank.".to_string());
        }
        if fields.price_in_cents.is_none() {
            errors.push("Price: is not a number.".to_string());
        }
        if fields.interval.unwrap_or(0) <= 0 {
            errors.push("Interval: must be greater than 0.".to_string());
        }
        if !matches!(fields.interval_unit.as_deref(), Some("month") | Some("day")) {
            errors.push("Interval unit: must be 'month' or 'day'.".to_string());
        }
        let handle = fields
            .handle
            .clone()
            .filter(|h| !h.trim().is_empty())
            .or_else(|| fields.name.as_deref().map(to_handle))
            .unwrap_or_default();
        if self.products.values().any(|p| p.handle == handle) {
            errors.push("API Handle: must be unique - that value has been taken.".to_string());
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let now = Utc::now();
        let product = Product {
            id: self.next_id(),
            name: fields.name.unwrap_or_default(),
            handle,
            description: fields.description,
            price_in_cents: fields.price_in_cents.unwrap_or_default(),
            interval: fields.interval.unwrap_or_default(),
            interval_unit: fields.interval_unit.unwrap_or_default(),
            trial_price_in_cents: fields.trial_price_in_cents,
            trial_interval: fields.trial_interval,
            trial_interval_unit: fields.trial_interval_unit,
            product_family: family,
            archived_at: None,
            created_at: now,
            updated_at: now,
        };
        self.products.insert(product.id, product.clone());
        Ok(Some(product))
    }

    pub fn update_product(&mut self, id: i64, fields: ProductFields) -> Option<Product> {
        let product = self.products.get_mut(&id)?;
        if let Some(v) = fields.name {
            product.name = v;
        }
        if let Some(v) = fields.handle {
            product.handle = v;
        }
        if fields.description.is_some() {
            product.description = fields.description;
        }
        if let Some(v) = fields.price_in_cents {
            product.price_in_cents = v;
        }
        if let Some(v) = fields.interval {
            product.interval = v;
        }
        if let Some(v) = fields.interval_unit {
            product.interval_unit = v;
        }
        product.updated_at = Utc::now();
        Some(product.clone())
    }

    pub fn product_by_handle(&self, handle: &str) -> Option<Product> {
        self.products.values().find(|p| p.handle == handle).cloned()
    }

    pub fn create_subscription(
        &mut self,
        fields: SubscriptionFields,
    ) -> Result<Subscription, Vec<String>> {
        let product = match (&fields.product_handle, fields.product_id) {
            (Some(handle), _) => self.product_by_handle(handle),
            (None, Some(id)) => self.products.get(&id).cloned(),
            (None, None) => None,
        };
        let Some(product) = product else {
            return Err(vec!["A valid Product must be specified.".to_string()]);
        };
        if product.archived_at.is_some() {
            return Err(vec!["Product: has been archived.".to_string()]);
        }

        let customer = if let Some(id) = fields.customer_id {
            self.customers.get(&id).cloned()
        } else if let Some(reference) = fields.customer_reference.as_deref() {
            self.customer_by_reference(reference)
        } else if let Some(attributes) = fields.customer_attributes {
            Some(self.create_customer(attributes)?)
        } else {
            None
        };
        let Some(customer) = customer else {
            return Err(vec!["A Customer must be specified.".to_string()]);
        };

        let now = Utc::now();
        let trial = product.trial_interval.filter(|n| *n > 0).map(|n| {
            let unit = product.trial_interval_unit.as_deref().unwrap_or("day");
            advance(now, n, unit)
        });
        let period_end = fields
            .next_billing_at
            .or(trial)
            .unwrap_or_else(|| advance(now, product.interval, &product.interval_unit));

        let record = SubscriptionRecord {
            id: self.next_id(),
            state: if trial.is_some() { "trialing" } else { "active" }.to_string(),
            customer_id: customer.id,
            product_id: product.id,
            coupon_code: fields.coupon_code,
            current_period_started_at: now,
            current_period_ends_at: period_end,
            trial_ended_at: trial,
            activated_at: trial.is_none().then_some(now),
            canceled_at: None,
            delayed_cancel_at: None,
            cancellation_message: None,
            reason_code: None,
            created_at: now,
            updated_at: now,
        };
        self.subscriptions.insert(record.id, record.clone());
        self.render(&record)
            .ok_or_else(|| vec!["subscription references missing records".to_string()])
    }

    pub fn subscription(&self, id: i64) -> Option<Subscription> {
        self.subscriptions.get(&id).and_then(|r| self.render(r))
    }

    pub fn subscriptions_where(&self, keep: impl Fn(&SubscriptionRecord) -> bool) -> Vec<Subscription> {
        self.subscriptions
            .values()
            .filter(|r| keep(*r))
            .filter_map(|r| self.render(r))
            .collect()
    }

    pub fn render(&self, record: &SubscriptionRecord) -> Option<Subscription> {
        Some(Subscription {
            id: record.id,
            state: record.state.clone(),
            balance_in_cents: 0,
            coupon_code: record.coupon_code.clone(),
            payment_collection_method: "automatic".to_string(),
            current_period_started_at: record.current_period_started_at,
            current_period_ends_at: record.current_period_ends_at,
            next_assessment_at: record.current_period_ends_at,
            trial_ended_at: record.trial_ended_at,
            activated_at: record.activated_at,
            canceled_at: record.canceled_at,
            delayed_cancel_at: record.delayed_cancel_at,
            cancel_at_end_of_period: record.delayed_cancel_at.is_some(),
            cancellation_message: record.cancellation_message.clone(),
            reason_code: record.reason_code.clone(),
            customer: self.customers.get(&record.customer_id)?.clone(),
            product: self.products.get(&record.product_id)?.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Moves `from` forward by `n` days or months.
pub fn advance(from: DateTime<Utc>, n: i64, unit: &str) -> DateTime<Utc> {
    match unit {
        "month" => u32::try_from(n)
            .ok()
            .and_then(|n| from.checked_add_months(Months::new(n)))
            .unwrap_or(from),
        _ => Duration::try_days(n)
            .and_then(|d| from.checked_add_signed(d))
            .unwrap_or(from),
    }
}

fn to_handle(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
