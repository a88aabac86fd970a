//! Blocking, typed client for the Chargify subscription-billing API.
//!
//! # Overview
//! Every operation runs through one path: a named endpoint from the registry
//! is resolved against the configured site root, sent once over a
//! [`Transport`], and the response status is classified into a typed result.
//! Request construction and classification are pure functions
//! ([`dispatch::build_request`], [`dispatch::classify`]); only the transport
//! touches the network, so everything above it is testable with canned
//! responses.
//!
//! # Design
//! - `endpoints` is a static table of (name, method, URI template, required
//!   path parameters).
//! - `dispatch` substitutes parameters, adds JSON and basic-auth headers, and
//!   maps status codes to `ApiReturn` or `ApiError`.
//! - `resources` holds the DTOs and the per-resource methods on
//!   [`ChargifyClient`].
//! - `config` carries credentials, either passed explicitly or set once for
//!   the whole process.
//!
//! No retries, rate limiting, caching, or pagination helpers: each call is a
//! single request.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod query;
pub mod resources;
pub mod transport;

pub use client::ChargifyClient;
pub use config::Config;
pub use dispatch::{ApiReturn, Call};
pub use endpoints::{Endpoint, EndpointName, Root};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use resources::billing_portal::BillingPortal;
pub use resources::coupons::{Coupon, CouponQuery, FlatCoupon, PercentageCoupon};
pub use resources::customers::{Customer, CustomerInput};
pub use resources::events::{Event, EventCount, EventCountQuery, EventQuery, EventSpecificData};
pub use resources::invoices::{Invoice, InvoiceQuery, InvoiceRefund, Payment, Refund};
pub use resources::metadata::{MetaData, MetaDataEntry};
pub use resources::payment_profiles::{BankAccount, PaymentProfile, PaymentProfileInput, VaultMethod};
pub use resources::products::{
    Component, Product, ProductFamily, ProductFamilyInput, ProductInput, ProductInterval,
};
pub use resources::subscriptions::{
    Cancellation, CreateSubscription, Migration, PaymentRefund, Subscription, SubscriptionComponent,
    SubscriptionQuery, Usage, UsageRecord,
};
pub use resources::Direction;
pub use transport::{Transport, UreqTransport};
