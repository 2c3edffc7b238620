//! # Outbound calls and messages
//!
//! [`Twilio::call_for`] starts a call whose instructions come from one of the
//! application's own TwiML views. The view is named by endpoint and resolved
//! to an absolute url through an [`EndpointResolver`]. Unless trusted mode is
//! on, a fresh token is embedded in the url as basic auth credentials, so the
//! callback can later prove it belongs to a call this application started.

use super::{
    ProviderError, Twilio,
    schemas::{CallResource, MessageResource},
};
use crate::{consts, metric};
use std::collections::HashMap;
use tracing::{error, info};

/// Turns an endpoint name into the absolute url Twilio should fetch
pub trait EndpointResolver {
    fn url_for(&self, endpoint: &str, query: &[(String, String)]) -> Option<String>;
}

/// Route table of endpoint names under one externally reachable base url
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    base_url: String,
    routes: HashMap<String, String>,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            routes: HashMap::new(),
        }
    }

    pub fn route(mut self, endpoint: &str, path: &str) -> Self {
        self.routes.insert(endpoint.to_string(), path.to_string());
        self
    }
}

impl EndpointResolver for Endpoints {
    fn url_for(&self, endpoint: &str, query: &[(String, String)]) -> Option<String> {
        let path = self.routes.get(endpoint)?;
        let mut url = url::Url::parse(&format!("{}{path}", self.base_url)).ok()?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Some(url.to_string())
    }
}

/// Optional parts of an outbound request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOptions {
    /// Originating number, the configured default when unset or empty
    pub from: Option<String>,
    /// Query parameters forwarded to the callback url
    pub query: Vec<(String, String)>,
    /// Extra Messages API fields, e.g. `MediaUrl`, sent with a message
    pub params: Vec<(String, String)>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_number(mut self, from: &str) -> Self {
        self.from = Some(from.to_string());
        self
    }

    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }
}

impl Twilio<'_> {
    fn from_number(&self, options: &CallOptions) -> String {
        options
            .from
            .clone()
            .filter(|from| !from.is_empty())
            .unwrap_or_else(|| self.settings().default_from.clone())
    }

    /// Absolute url of `endpoint`, carrying a fresh token unless trusted
    pub fn callback_url(
        &self,
        resolver: &dyn EndpointResolver,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<String, ProviderError> {
        let url = resolver.url_for(endpoint, query).ok_or_else(|| {
            ProviderError::InvalidRequest(format!("unknown callback endpoint: {endpoint}"))
        })?;

        if self.is_trusted() || !self.settings().bearer_token_enabled() {
            return Ok(url);
        }

        let token = self.sign_token()?;

        let mut url = url::Url::parse(&url)
            .map_err(|e| ProviderError::InvalidRequest(format!("invalid callback url: {e}")))?;
        url.set_username(consts::BASIC_AUTH_USERNAME)
            .and_then(|_| url.set_password(Some(&token)))
            .map_err(|_| {
                ProviderError::InvalidRequest("callback url cannot carry credentials".to_string())
            })?;

        Ok(url.to_string())
    }

    /// Calls `to`, Twilio fetches the call's TwiML from `endpoint`
    pub async fn call_for(
        &self,
        resolver: &dyn EndpointResolver,
        endpoint: &str,
        to: &str,
        options: CallOptions,
    ) -> Result<CallResource, ProviderError> {
        if to.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "a destination number is required".to_string(),
            ));
        }

        let url = self.callback_url(resolver, endpoint, &options.query)?;
        let from = self.from_number(&options);

        match self.client().create_call(to, &from, &url).await {
            Ok(call) => {
                metric::incr_outbound_statds("call_created");
                info!("Twilio call {} created for {}", call.sid, endpoint);
                Ok(call)
            }
            Err(e) => {
                metric::incr_outbound_statds("call_failed");
                error!("Twilio call for {} failed: {}", endpoint, e);
                Err(e)
            }
        }
    }

    /// Sends a text message to `to`, with `options.params` as extra fields
    pub async fn message(
        &self,
        body: &str,
        to: &str,
        options: CallOptions,
    ) -> Result<MessageResource, ProviderError> {
        if to.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "a destination number is required".to_string(),
            ));
        }

        let from = self.from_number(&options);

        match self
            .client()
            .create_message(body, to, &from, &options.params)
            .await
        {
            Ok(message) => {
                metric::incr_outbound_statds("message_created");
                Ok(message)
            }
            Err(e) => {
                metric::incr_outbound_statds("message_failed");
                error!("Twilio message failed: {}", e);
                Err(e)
            }
        }
    }
}
