//! Static registry of endpoint templates.
//!
//! Every operation the client can perform is an [`EndpointName`]. Its
//! [`Endpoint`] carries the HTTP method, a URI template relative to a root,
//! and the placeholders the caller must supply. Templates may carry a literal
//! query section (`lookup.json?reference={reference}`); placeholders there
//! count as path parameters too.

use std::fmt;
use std::str::FromStr;

use crate::http::HttpMethod;

/// A resolved registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub name: EndpointName,
    pub method: HttpMethod,
    pub uri: &'static str,
    pub path_params: &'static [&'static str],
}

macro_rules! registry {
    ($($variant:ident => $name:literal, $method:ident, $uri:literal, [$($param:literal),*];)+) => {
        /// Symbolic name of every endpoint the client knows.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EndpointName {
            $($variant,)+
        }

        impl EndpointName {
            pub const ALL: &'static [EndpointName] = &[$(EndpointName::$variant,)+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(EndpointName::$variant => $name,)+
                }
            }

            pub fn endpoint(self) -> Endpoint {
                match self {
                    $(EndpointName::$variant => Endpoint {
                        name: self,
                        method: HttpMethod::$method,
                        uri: $uri,
                        path_params: &[$($param),*],
                    },)+
                }
            }
        }

        impl FromStr for EndpointName {
            type Err = UnknownEndpoint;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(EndpointName::$variant),)+
                    other => Err(UnknownEndpoint(other.to_string())),
                }
            }
        }
    };
}

registry! {
    BillingPortalEnable => "billing_portal_enable", Post, "portal/customers/{id}/enable", ["id"];
    BillingPortalEnableAndInvite => "billing_portal_enable_and_invite", Post, "portal/customers/{id}/enable?invite=1", ["id"];
    BillingPortalGet => "billing_portal_get", Get, "portal/customers/{id}/management_link", ["id"];

    CouponCreate => "coupon_create", Post, "product_families/{product_family_id}/coupons", ["product_family_id"];
    CouponFind => "coupon_find", Get, "coupons/find?code={code}&product_family_id={product_family_id}", ["code", "product_family_id"];
    CouponArchive => "coupon_archive", Delete, "product_families/{product_family_id}/coupons/{coupon_id}.json", ["product_family_id", "coupon_id"];
    CouponsList => "coupons_list", Get, "coupons.json", [];

    CustomerCreate => "customer_create", Post, "customers", [];
    CustomerDelete => "customer_delete", Delete, "customers/{id}", ["id"];
    CustomerUpdate => "customer_update", Put, "customers/{id}", ["id"];
    CustomersGet => "customers_get", Get, "customers", [];
    CustomerGet => "customer_get", Get, "customers/{id}.json", ["id"];
    CustomerGetByReference => "customer_get_by_reference", Get, "customers/lookup.json?reference={reference}", ["reference"];
    CustomerSubscriptionsList => "customer_subscriptions_list", Get, "customers/{customer_id}/subscriptions.json", ["customer_id"];

    Events => "events", Get, "events.json", [];
    EventsCount => "events_count", Get, "events/count.json", [];
    EventsIngestion => "events_ingestion", Post, "{api_handle}.json", ["api_handle"];
    EventsBulkIngestion => "events_bulk_ingestion", Post, "{api_handle}/bulk.json", ["api_handle"];

    PaymentProfileCreate => "payment_profile_create", Post, "payment_profiles", [];
    PaymentProfileUpdate => "payment_profile_update", Put, "payment_profiles/{payment_profile_id}", ["payment_profile_id"];
    PaymentProfileDelete => "payment_profile_delete", Delete, "/subscriptions/{subscription_id}/payment_profiles/{payment_profile_id}", ["subscription_id", "payment_profile_id"];

    ProductFamilyCreate => "product_family_create", Post, "product_families", [];
    ProductFamilyGet => "product_family_get", Get, "product_families/{id}", ["id"];
    ProductFamiliesGet => "product_families_get", Get, "product_families.json", [];
    ProductFamilyProductsGet => "product_family_products_get", Get, "product_families/{id}/products.json", ["id"];
    ProductFamilyComponentsGet => "product_family_components_get", Get, "product_families/{product_family_id}/components.json", ["product_family_id"];
    ProductFamilyComponentByIdGet => "product_family_component_by_id_get", Get, "product_families/{product_family_id}/components/{component_id}.json", ["product_family_id", "component_id"];
    ProductFamilyComponentByHandleGet => "product_family_component_by_handle_get", Get, "product_families/{product_family_id}/components/handle:{component_handle}.json", ["product_family_id", "component_handle"];
    ProductCreate => "product_create", Post, "product_families/{product_family_id}/products", ["product_family_id"];
    ProductUpdate => "product_update", Put, "products/{id}", ["id"];
    ProductArchive => "product_archive", Delete, "products/{id}", ["id"];
    ProductGetById => "product_get_by_id", Get, "products/{id}", ["id"];
    ProductGetByHandle => "product_get_by_handle", Get, "products/handle/{handle}", ["handle"];

    SubscriptionCreate => "subscription_create", Post, "subscriptions", [];
    SubscriptionsList => "subscriptions_list", Get, "subscriptions.json", [];
    SubscriptionGet => "subscription_get", Get, "subscriptions/{subscription_id}", ["subscription_id"];
    SubscriptionUpdate => "subscription_update", Put, "subscriptions/{subscription_id}", ["subscription_id"];
    SubscriptionGetMetaData => "subscription_get_meta_data", Get, "subscriptions/{subscription_id}/metadata", ["subscription_id"];
    SubscriptionCancelImmediately => "subscription_cancel_immediately", Delete, "subscriptions/{subscription_id}", ["subscription_id"];
    SubscriptionCancelDelayed => "subscription_cancel_delayed", Post, "subscriptions/{subscription_id}/delayed_cancel", ["subscription_id"];
    SubscriptionRemoveDelayedCancel => "subscription_remove_delayed_cancel", Delete, "subscriptions/{subscription_id}/delayed_cancel", ["subscription_id"];
    SubscriptionMigrate => "subscription_migrate", Post, "subscriptions/{subscription_id}/migrations", ["subscription_id"];
    SubscriptionRefund => "subscription_refund", Post, "subscriptions/{subscription_id}/refunds", ["subscription_id"];
    SubscriptionEvents => "subscription_events", Get, "subscriptions/{subscription_id}/events.json", ["subscription_id"];
    SubscriptionComponentsList => "subscription_components_list", Get, "subscriptions/{subscription_id}/components.json", ["subscription_id"];
    SubscriptionComponentsUsages => "subscription_components_usages", Post, "subscriptions/{subscription_id}/components/{component_id}/usages.json", ["subscription_id", "component_id"];
    SubscriptionPurge => "subscription_purge", Post, "subscriptions/{subscription_id}/purge.json", ["subscription_id"];

    InvoicesGet => "invoices_get", Get, "invoices.json", [];
    InvoiceGet => "invoice_get", Get, "invoices/{uid}.json", ["uid"];
    InvoiceRefund => "invoice_refund", Post, "invoices/{uid}/refunds.json", ["uid"];
}

/// Which configured root a template is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    Api,
    Events,
}

impl EndpointName {
    pub fn root(self) -> Root {
        match self {
            EndpointName::EventsIngestion | EndpointName::EventsBulkIngestion => Root::Events,
            _ => Root::Api,
        }
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown endpoint: {0}")]
pub struct UnknownEndpoint(pub String);

/// Names of every `{placeholder}` in a template, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                found.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    found
}
