//! Blocking client for the billing API.
//!
//! # Design
//! `ChargifyClient` owns a `Config` and a `Transport` and carries no other
//! state between calls. [`ChargifyClient::call`] is the single dispatch path:
//! build the request, execute it once, classify the response. Every resource
//! mapper in `crate::resources` is a thin method on top of it.

use tracing::{debug, debug_span};

use crate::config::{self, Config};
use crate::dispatch::{build_request, classify, ApiReturn, Call};
use crate::error::ApiError;
use crate::transport::{Transport, UreqTransport};

#[derive(Debug, Clone)]
pub struct ChargifyClient<T = UreqTransport> {
    config: Config,
    transport: T,
}

impl ChargifyClient<UreqTransport> {
    /// Client over the default blocking transport. Fails if the config lacks
    /// a subdomain or API key.
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(Config::from_env())
    }

    /// Client over the process-wide configuration, see [`config::global`].
    pub fn from_global() -> Result<Self, ApiError> {
        Self::new(config::global())
    }
}

impl<T: Transport> ChargifyClient<T> {
    pub fn with_transport(config: Config, transport: T) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends one request and classifies the response.
    pub fn call(&self, call: Call) -> Result<ApiReturn, ApiError> {
        let span = debug_span!("chargify_call", endpoint = %call.endpoint);
        let _enter = span.enter();

        let request = build_request(&self.config, &call)?;
        let response = self.transport.execute(request)?;
        debug!(status = response.status, "received response");
        classify(response)
    }
}
