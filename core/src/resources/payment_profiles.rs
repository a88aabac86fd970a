//! Stored payment methods: cards, bank accounts, and vault tokens.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::client::ChargifyClient;
use crate::dispatch::Call;
use crate::endpoints::EndpointName;
use crate::error::ApiError;
use crate::resources::{envelope, lenient_string};
use crate::transport::Transport;

/// Payment vaults a stored token can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultMethod {
    Bogus,
    #[serde(rename = "authorizenet")]
    Authorize,
    #[serde(rename = "authorizenet_cim")]
    AuthorizeCim,
    #[serde(rename = "beanstream")]
    BeanStream,
    #[serde(rename = "bpoint")]
    BPoint,
    #[serde(rename = "braintree_blue")]
    Braintree,
    Chargify,
    #[serde(rename = "cybersource")]
    CyberSource,
    Elavon,
    #[serde(rename = "eway")]
    EWay,
    #[serde(rename = "eway_rapid_std")]
    EWayRapid,
    #[serde(rename = "firstdata")]
    FirstData,
    #[serde(rename = "fusebox")]
    FuseBox,
    Litle,
    Moneris,
    MonerisUs,
    Orbital,
    PaymentExpress,
    Paymill,
    Pin,
    #[serde(rename = "quickpay")]
    QuickPay,
    Square,
    #[serde(rename = "stripe_connect")]
    Stripe,
    TrustCommerce,
    #[serde(rename = "wirecard")]
    WireCard,
}

impl VaultMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            VaultMethod::Bogus => "bogus",
            VaultMethod::Authorize => "authorizenet",
            VaultMethod::AuthorizeCim => "authorizenet_cim",
            VaultMethod::BeanStream => "beanstream",
            VaultMethod::BPoint => "bpoint",
            VaultMethod::Braintree => "braintree_blue",
            VaultMethod::Chargify => "chargify",
            VaultMethod::CyberSource => "cybersource",
            VaultMethod::Elavon => "elavon",
            VaultMethod::EWay => "eway",
            VaultMethod::EWayRapid => "eway_rapid_std",
            VaultMethod::FirstData => "firstdata",
            VaultMethod::FuseBox => "fusebox",
            VaultMethod::Litle => "litle",
            VaultMethod::Moneris => "moneris",
            VaultMethod::MonerisUs => "moneris_us",
            VaultMethod::Orbital => "orbital",
            VaultMethod::PaymentExpress => "payment_express",
            VaultMethod::Paymill => "paymill",
            VaultMethod::Pin => "pin",
            VaultMethod::QuickPay => "quickpay",
            VaultMethod::Square => "square",
            VaultMethod::Stripe => "stripe_connect",
            VaultMethod::TrustCommerce => "trust_commerce",
            VaultMethod::WireCard => "wirecard",
        }
    }
}

impl fmt::Display for VaultMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored payment profile as returned by the API. Card and account numbers
/// come back masked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentProfile {
    pub id: i64,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub masked_card_number: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
    /// Numeric in the API, but kept as a string since months keep their
    /// leading zero in some gateways.
    #[serde(default, deserialize_with = "lenient_string")]
    pub expiration_month: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub expiration_year: Option<String>,
    #[serde(default)]
    pub billing_address: Option<String>,
    #[serde(default)]
    pub billing_city: Option<String>,
    #[serde(default)]
    pub billing_state: Option<String>,
    #[serde(default)]
    pub billing_zip: Option<String>,
    #[serde(default)]
    pub billing_country: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub masked_bank_routing_number: Option<String>,
    #[serde(default)]
    pub masked_bank_account_number: Option<String>,
    #[serde(default)]
    pub bank_account_type: Option<String>,
    #[serde(default)]
    pub bank_account_holder_type: Option<String>,
    #[serde(default)]
    pub current_vault: Option<String>,
    #[serde(default)]
    pub vault_token: Option<String>,
    #[serde(default)]
    pub verified: Option<bool>,
}

/// Fields sent when creating or updating a payment profile. Which ones are
/// required depends on `payment_type` and the site's gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentProfileInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    /// `credit_card` (default), `bank_account`, or `paypal_account`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_country: Option<String>,
    #[serde(flatten)]
    pub bank_account: Option<BankAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paypal_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_nonce: Option<String>,
    /// Only accepted when the profile is created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_token: Option<String>,
    /// Required alongside `vault_token`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_vault: Option<VaultMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chargify_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

/// ACH bank account details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub bank_name: String,
    pub bank_routing_number: String,
    pub bank_account_number: String,
    /// `checking` or `savings`.
    pub bank_account_type: String,
    /// `personal` or `business`.
    pub bank_account_holder_type: String,
}

impl<T: Transport> ChargifyClient<T> {
    /// Saves a new payment profile. The API answers 201 on success; any other
    /// success status is treated as a failure.
    pub fn create_payment_profile(&self, input: &PaymentProfileInput) -> Result<PaymentProfile, ApiError> {
        let call = Call::new(EndpointName::PaymentProfileCreate)
            .body(&envelope("payment_profile", input))?;
        self.call(call)?.expect_status(201)?.field("payment_profile")
    }

    /// Saves a profile backed by a token already held in `vault`.
    pub fn save_vault_payment_profile(
        &self,
        customer_id: i64,
        vault: VaultMethod,
        vault_token: &str,
    ) -> Result<PaymentProfile, ApiError> {
        if vault_token.trim().is_empty() {
            return Err(ApiError::InvalidInput("vault token is required".to_string()));
        }
        self.create_payment_profile(&PaymentProfileInput {
            customer_id: Some(customer_id),
            vault_token: Some(vault_token.to_string()),
            current_vault: Some(vault),
            ..PaymentProfileInput::default()
        })
    }

    pub fn save_ach_payment_profile(
        &self,
        customer_id: i64,
        account: &BankAccount,
    ) -> Result<PaymentProfile, ApiError> {
        if account.bank_name.is_empty()
            || account.bank_routing_number.is_empty()
            || account.bank_account_number.is_empty()
        {
            return Err(ApiError::InvalidInput(
                "bank name, routing number, and account number are required".to_string(),
            ));
        }
        self.create_payment_profile(&PaymentProfileInput {
            customer_id: Some(customer_id),
            payment_type: Some("bank_account".to_string()),
            bank_account: Some(account.clone()),
            ..PaymentProfileInput::default()
        })
    }

    pub fn update_payment_profile(
        &self,
        profile_id: i64,
        input: &PaymentProfileInput,
    ) -> Result<PaymentProfile, ApiError> {
        let call = Call::new(EndpointName::PaymentProfileUpdate)
            .path("payment_profile_id", profile_id)
            .body(&envelope("payment_profile", input))?;
        self.call(call)?.expect_status(200)?.field("payment_profile")
    }

    /// Removes a profile from a subscription. Only a 204 counts as deleted.
    pub fn delete_payment_profile(&self, subscription_id: i64, profile_id: i64) -> Result<(), ApiError> {
        let call = Call::new(EndpointName::PaymentProfileDelete)
            .path("subscription_id", subscription_id)
            .path("payment_profile_id", profile_id);
        self.call(call)?.expect_status(204)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::resources::test_support::client;
    use serde_json::json;

    const PROFILE: &str = r#"{"payment_profile":{"id":77,"customer_id":12,"current_vault":"bogus","vault_token":"tok_1","expiration_month":4,"expiration_year":2030,"masked_card_number":"XXXX-1111"}}"#;

    #[test]
    fn vault_profile_is_posted_and_requires_created() {
        let c = client(vec![(201, PROFILE), (200, PROFILE)]);

        let profile = c.save_vault_payment_profile(12, VaultMethod::Bogus, "tok_1").unwrap();
        assert_eq!(profile.id, 77);
        assert_eq!(profile.expiration_month.as_deref(), Some("4"));
        assert_eq!(
            c.transport().last_body(),
            json!({"payment_profile": {"customer_id": 12, "vault_token": "tok_1", "current_vault": "bogus"}})
        );
        assert_eq!(c.transport().last_request().url, "https://acme.chargify.com/payment_profiles");

        let err = c.save_vault_payment_profile(12, VaultMethod::Bogus, "tok_1").unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 200, .. }));
    }

    #[test]
    fn ach_profile_flattens_bank_fields() {
        let c = client(vec![(201, PROFILE)]);
        let account = BankAccount {
            bank_name: "First Bank".to_string(),
            bank_routing_number: "021000021".to_string(),
            bank_account_number: "9876543210".to_string(),
            bank_account_type: "checking".to_string(),
            bank_account_holder_type: "personal".to_string(),
        };
        c.save_ach_payment_profile(12, &account).unwrap();
        assert_eq!(
            c.transport().last_body(),
            json!({"payment_profile": {
                "customer_id": 12,
                "payment_type": "bank_account",
                "bank_name": "First Bank",
                "bank_routing_number": "021000021",
                "bank_account_number": "9876543210",
                "bank_account_type": "checking",
                "bank_account_holder_type": "personal"
            }})
        );
    }

    #[test]
    fn ach_profile_requires_account_numbers() {
        let c = client(vec![]);
        let err = c.save_ach_payment_profile(12, &BankAccount::default()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert!(c.transport().requests().is_empty());
    }

    #[test]
    fn update_targets_profile_id() {
        let c = client(vec![(200, PROFILE)]);
        let input = PaymentProfileInput {
            billing_zip: Some("02134".to_string()),
            ..PaymentProfileInput::default()
        };
        c.update_payment_profile(77, &input).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "https://acme.chargify.com/payment_profiles/77");
        assert_eq!(c.transport().last_body(), json!({"payment_profile": {"billing_zip": "02134"}}));
    }

    #[test]
    fn delete_requires_no_content() {
        let c = client(vec![(204, ""), (200, "{}")]);
        c.delete_payment_profile(5, 77).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, "https://acme.chargify.com/subscriptions/5/payment_profiles/77");

        assert!(matches!(
            c.delete_payment_profile(5, 77).unwrap_err(),
            ApiError::HttpError { status: 200, .. }
        ));
    }

    #[test]
    fn vault_names_match_wire_values() {
        for vault in [VaultMethod::Stripe, VaultMethod::MonerisUs, VaultMethod::EWayRapid] {
            assert_eq!(serde_json::to_value(vault).unwrap(), json!(vault.as_str()));
        }
    }
}
