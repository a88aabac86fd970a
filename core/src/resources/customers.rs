//! Customers and customer lookup.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ChargifyClient;
use crate::dispatch::Call;
use crate::endpoints::EndpointName;
use crate::error::ApiError;
use crate::resources::subscriptions::Subscription;
use crate::resources::{envelope, require, Direction};
use crate::transport::Transport;

/// A customer as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Comma-separated addresses copied on all customer mail.
    #[serde(default)]
    pub cc_emails: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    /// The caller's own identifier for this customer.
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub address_2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub portal_customer_created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub portal_invite_last_sent_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub portal_invite_last_accepted_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub tax_exempt: Option<bool>,
    #[serde(default)]
    pub vat_number: Option<String>,
}

impl Customer {
    /// `cc_emails` split into trimmed addresses.
    pub fn cc_email_list(&self) -> Vec<String> {
        self.cc_emails
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Fields sent when creating or updating a customer. Omitted fields are left
/// unchanged on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc_emails: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_exempt: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_number: Option<String>,
}

impl CustomerInput {
    pub fn new(first_name: &str, last_name: &str, email: &str) -> Self {
        Self {
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            email: Some(email.to_string()),
            ..Self::default()
        }
    }

    pub fn with_reference(mut self, reference: &str) -> Self {
        self.reference = Some(reference.to_string());
        self
    }
}

impl<T: Transport> ChargifyClient<T> {
    /// Creates a customer. First name, last name, and email are required.
    pub fn create_customer(&self, input: &CustomerInput) -> Result<Customer, ApiError> {
        if [&input.first_name, &input.last_name, &input.email]
            .iter()
            .any(|v| v.as_deref().map_or(true, |s| s.trim().is_empty()))
        {
            return Err(ApiError::InvalidInput(
                "first name, last name, and email are all required".to_string(),
            ));
        }
        let call = Call::new(EndpointName::CustomerCreate).body(&envelope("customer", input))?;
        self.call(call)?.field("customer")
    }

    pub fn update_customer(&self, id: i64, input: &CustomerInput) -> Result<Customer, ApiError> {
        let call = Call::new(EndpointName::CustomerUpdate)
            .path("id", id)
            .body(&envelope("customer", input))?;
        self.call(call)?.expect_status(200)?.field("customer")
    }

    pub fn get_customer(&self, id: i64) -> Result<Customer, ApiError> {
        self.call(Call::new(EndpointName::CustomerGet).path("id", id))?
            .field("customer")
    }

    /// Looks a customer up by the caller's own reference.
    pub fn get_customer_by_reference(&self, reference: &str) -> Result<Customer, ApiError> {
        require("reference", Some(reference))?;
        self.call(Call::new(EndpointName::CustomerGetByReference).path("reference", reference))?
            .field("customer")
    }

    /// Permanently deletes a customer.
    pub fn delete_customer(&self, id: i64) -> Result<(), ApiError> {
        self.call(Call::new(EndpointName::CustomerDelete).path("id", id))?.expect_success()?;
        Ok(())
    }

    /// One page of the site's customers. Pages are 1-based.
    pub fn list_customers(&self, page: u32, direction: Direction) -> Result<Vec<Customer>, ApiError> {
        if page < 1 {
            return Err(ApiError::InvalidInput(
                "page must be 1 or higher, not 0 indexed".to_string(),
            ));
        }
        let call = Call::new(EndpointName::CustomersGet)
            .query_pair("direction", direction_str(direction))
            .query_pair("page", page);
        self.call(call)?.list("customer")
    }

    pub fn list_customer_subscriptions(&self, customer_id: i64) -> Result<Vec<Subscription>, ApiError> {
        self.call(Call::new(EndpointName::CustomerSubscriptionsList).path("customer_id", customer_id))?
            .list("subscription")
    }

    /// Free-text search over name, email, organization, and reference.
    pub fn search_customers(&self, query: &str) -> Result<Vec<Customer>, ApiError> {
        self.call(Call::new(EndpointName::CustomersGet).query_pair("q", query))?
            .list("customer")
    }

    /// Every customer with this email; several may share one.
    pub fn search_customers_by_email(&self, email: &str) -> Result<Vec<Customer>, ApiError> {
        require("email", Some(email))?;
        self.search_customers(email)
    }

    /// Searches by reference, then keeps the exact match only.
    pub fn find_customer_by_reference(&self, reference: &str) -> Result<Customer, ApiError> {
        require("reference", Some(reference))?;
        let candidates = self.search_customers(reference)?;
        debug!(reference, candidates = candidates.len(), "searched customers by reference");
        candidates
            .into_iter()
            .find(|c| c.reference.as_deref() == Some(reference))
            .ok_or(ApiError::NotFound)
    }
}

fn direction_str(direction: Direction) -> &'static str {
    match direction {
        Direction::Asc => "asc",
        Direction::Desc => "desc",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::resources::test_support::client;
    use serde_json::json;

    const CUSTOMER: &str = r#"{"customer":{"id":42,"first_name":"Ada","last_name":"Lovelace","email":"ada@example.com","reference":"ada-1","organization":null,"cc_emails":"a@example.com, b@example.com","created_at":"2024-03-01T10:00:00-05:00","verified":false}}"#;

    #[test]
    fn create_customer_sends_envelope_and_decodes() {
        let c = client(vec![(201, CUSTOMER)]);
        let input = CustomerInput::new("Ada", "Lovelace", "ada@example.com").with_reference("ada-1");

        let customer = c.create_customer(&input).unwrap();
        assert_eq!(customer.id, 42);
        assert_eq!(customer.reference.as_deref(), Some("ada-1"));
        assert!(customer.organization.is_none());
        assert_eq!(customer.cc_email_list(), vec!["a@example.com", "b@example.com"]);

        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://acme.chargify.com/customers");
        assert_eq!(
            c.transport().last_body(),
            json!({"customer": {"first_name": "Ada", "last_name": "Lovelace", "email": "ada@example.com", "reference": "ada-1"}})
        );
    }

    #[test]
    fn create_customer_requires_name_and_email() {
        let c = client(vec![]);
        let input = CustomerInput {
            first_name: Some("Ada".to_string()),
            ..CustomerInput::default()
        };
        assert!(matches!(c.create_customer(&input).unwrap_err(), ApiError::InvalidInput(_)));
        assert!(c.transport().requests().is_empty());
    }

    #[test]
    fn create_customer_surfaces_validation_errors() {
        let c = client(vec![(422, r#"{"errors":["Email address: has already been taken."]}"#)]);
        let err = c
            .create_customer(&CustomerInput::new("Ada", "Lovelace", "ada@example.com"))
            .unwrap_err();
        match err {
            ApiError::Validation { errors } => {
                assert_eq!(errors, vec!["Email address: has already been taken."])
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn update_customer_puts_partial_body() {
        let c = client(vec![(200, CUSTOMER)]);
        let input = CustomerInput {
            city: Some("London".to_string()),
            ..CustomerInput::default()
        };
        c.update_customer(42, &input).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "https://acme.chargify.com/customers/42");
        assert_eq!(c.transport().last_body(), json!({"customer": {"city": "London"}}));
    }

    #[test]
    fn get_customer_by_reference_uses_lookup() {
        let c = client(vec![(200, CUSTOMER)]);
        let customer = c.get_customer_by_reference("ada-1").unwrap();
        assert_eq!(customer.email, "ada@example.com");
        assert_eq!(
            c.transport().last_request().url,
            "https://acme.chargify.com/customers/lookup.json?reference=ada-1"
        );
    }

    #[test]
    fn get_customer_not_found() {
        let c = client(vec![(404, "")]);
        assert!(c.get_customer(1).unwrap_err().is_not_found());
    }

    #[test]
    fn list_customers_validates_page_and_passes_query() {
        let c = client(vec![(200, format!("[{CUSTOMER}]").as_str())]);
        assert!(matches!(
            c.list_customers(0, Direction::Asc).unwrap_err(),
            ApiError::InvalidInput(_)
        ));

        let found = c.list_customers(2, Direction::Desc).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(
            c.transport().last_request().url,
            "https://acme.chargify.com/customers?direction=desc&page=2"
        );
    }

    #[test]
    fn find_by_reference_requires_exact_match() {
        let other = r#"{"customer":{"id":7,"first_name":"B","last_name":"C","email":"b@example.com","reference":"ada-10"}}"#;
        let body = format!("[{other}]");
        let c = client(vec![(200, body.as_str()), (200, format!("[{other},{CUSTOMER}]").as_str())]);

        assert!(c.find_customer_by_reference("ada-1").unwrap_err().is_not_found());
        let found = c.find_customer_by_reference("ada-1").unwrap();
        assert_eq!(found.id, 42);
        assert_eq!(
            c.transport().last_request().url,
            "https://acme.chargify.com/customers?q=ada-1"
        );
    }

    #[test]
    fn delete_customer_accepts_no_content() {
        let c = client(vec![(204, "")]);
        c.delete_customer(42).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, "https://acme.chargify.com/customers/42");
    }

    #[test]
    fn delete_customer_rejects_unavailable() {
        let c = client(vec![(503, "Service Unavailable")]);
        assert!(matches!(
            c.delete_customer(42).unwrap_err(),
            ApiError::HttpError { status: 503, .. }
        ));
    }
}
