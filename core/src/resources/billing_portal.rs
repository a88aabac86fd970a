//! Self-service billing portal.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::client::ChargifyClient;
use crate::dispatch::Call;
use crate::endpoints::EndpointName;
use crate::error::ApiError;
use crate::transport::Transport;

/// A customer's portal management link. The link rotates periodically and
/// `new_link_available_at` says when the next one can be fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingPortal {
    pub url: String,
    #[serde(default)]
    pub fetch_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub new_link_available_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<FixedOffset>>,
}

impl<T: Transport> ChargifyClient<T> {
    /// Enables the portal for a customer, optionally emailing an invitation.
    /// The API rejects this if the portal is already enabled.
    pub fn enable_billing_portal(&self, customer_id: i64, send_invite: bool) -> Result<(), ApiError> {
        let endpoint = if send_invite {
            EndpointName::BillingPortalEnableAndInvite
        } else {
            EndpointName::BillingPortalEnable
        };
        self.call(Call::new(endpoint).path("id", customer_id))?.expect_success()?;
        Ok(())
    }

    pub fn get_billing_portal(&self, customer_id: i64) -> Result<BillingPortal, ApiError> {
        self.call(Call::new(EndpointName::BillingPortalGet).path("id", customer_id))?
            .decode()
    }
}
