//! Invoices, their payments, and refunds.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::client::ChargifyClient;
use crate::dispatch::Call;
use crate::endpoints::EndpointName;
use crate::error::ApiError;
use crate::resources::{envelope, require, Direction};
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub uid: String,
    #[serde(default)]
    pub site_id: Option<i64>,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub subscription_id: Option<i64>,
    /// Human-facing invoice number. Not necessarily numeric.
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub sequence_number: Option<i64>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub paid_date: Option<NaiveDate>,
    /// `draft`, `open`, `paid`, `pending`, `voided`, or `canceled`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_family_name: Option<String>,
    #[serde(default)]
    pub subtotal_amount: Option<String>,
    #[serde(default)]
    pub total_amount: Option<String>,
    #[serde(default)]
    pub paid_amount: Option<String>,
    #[serde(default)]
    pub due_amount: Option<String>,
    #[serde(default)]
    pub customer: Option<InvoiceCustomer>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub refunds: Vec<Refund>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

/// The customer snapshot embedded in an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceCustomer {
    #[serde(default)]
    pub chargify_id: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// A payment applied to an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub transaction_id: i64,
    #[serde(default)]
    pub transaction_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub original_amount: Option<String>,
    #[serde(default)]
    pub applied_amount: Option<String>,
    #[serde(default)]
    pub prepayment: bool,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentMethod {
    pub details: Option<String>,
    pub kind: Option<String>,
    pub memo: Option<String>,
    #[serde(rename = "type")]
    pub payment_type: Option<String>,
    pub card_brand: Option<String>,
    pub card_expiration: Option<String>,
    pub last_four: Option<String>,
    pub masked_card_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    pub transaction_id: i64,
    #[serde(default)]
    pub payment_id: Option<i64>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub original_amount: Option<String>,
    #[serde(default)]
    pub applied_amount: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

/// A refund against one payment of an invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRefund {
    pub amount: String,
    pub memo: String,
    pub payment_id: i64,
    /// Record a refund made outside the gateway.
    pub external: bool,
    /// Credit the customer's balance instead of refunding the payment.
    pub apply_credit: bool,
    pub void_invoice: bool,
}

#[derive(Deserialize)]
struct InvoicePage {
    invoices: Vec<Invoice>,
}

impl<T: Transport> ChargifyClient<T> {
    pub fn list_invoices(&self, query: &InvoiceQuery) -> Result<Vec<Invoice>, ApiError> {
        let page: InvoicePage = self
            .call(Call::new(EndpointName::InvoicesGet).query(query)?)?
            .decode()?;
        Ok(page.invoices)
    }

    pub fn get_invoice(&self, uid: &str) -> Result<Invoice, ApiError> {
        require("invoice uid", Some(uid))?;
        self.call(Call::new(EndpointName::InvoiceGet).path("uid", uid))?
            .decode()
    }

    /// Refunds a payment on the invoice and returns the updated invoice.
    pub fn refund_invoice(&self, uid: &str, refund: &InvoiceRefund) -> Result<Invoice, ApiError> {
        require("invoice uid", Some(uid))?;
        require("amount", Some(refund.amount.as_str()))?;
        require("memo", Some(refund.memo.as_str()))?;
        let call = Call::new(EndpointName::InvoiceRefund)
            .path("uid", uid)
            .body(&envelope("refund", refund))?;
        self.call(call)?.decode()
    }
}
