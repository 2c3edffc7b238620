//! # Twilio API Client
//!
//! This module provides a client for the Twilio REST API. It handles
//! authentication and the two operations the application needs: creating an
//! outbound call and sending a message. Failures are reported as
//! [`ProviderError`] and never retried here.

use super::{
    errors::{ApiErrorBody, ProviderError},
    schemas::{CallResource, MessageResource},
};
use crate::{config::TwilioSettings, consts};
use async_trait::async_trait;

/// Outbound operations offered by the voice/SMS provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceProvider {
    /// Starts a call to `to`; Twilio fetches its instructions from `url`
    async fn create_call(
        &self,
        to: &str,
        from: &str,
        url: &str,
    ) -> Result<CallResource, ProviderError>;

    /// Sends `body` to `to`; `params` are extra Messages API fields such as
    /// `MediaUrl` or `StatusCallback`, passed under their Twilio names
    async fn create_message(
        &self,
        body: &str,
        to: &str,
        from: &str,
        params: &[(String, String)],
    ) -> Result<MessageResource, ProviderError>;
}

pub type ImplVoiceProvider = Box<dyn VoiceProvider>;

/// Twilio API client for creating calls and messages
pub struct TwilioClient {
    /// HTTP client for making API requests
    client: reqwest::Client,
    /// API root, `https://api.twilio.com` outside tests
    base_url: String,
    /// Account owning the created resources
    account_sid: String,
    /// Basic auth username (account SID or API key SID)
    auth_sid: String,
    /// Basic auth password
    auth_token: String,
}

impl TwilioClient {
    /// Creates a new Twilio client on top of a shared HTTP connection pool
    pub fn new(client: reqwest::Client, settings: &TwilioSettings) -> Self {
        Self {
            client,
            base_url: settings.api_base_url.clone(),
            account_sid: settings.account_sid.clone(),
            auth_sid: settings.auth_sid.clone(),
            auth_token: settings.auth_token.clone(),
        }
    }

    fn resource_url(&self, resource: &str) -> String {
        format!(
            "{base}/{version}/Accounts/{sid}/{resource}.json",
            base = self.base_url,
            version = consts::TWILIO_API_VERSION,
            sid = self.account_sid,
        )
    }

    /// Internal method to post any form to a Twilio list resource
    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        form: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .post(self.resource_url(resource))
            .basic_auth(&self.auth_sid, Some(&self.auth_token))
            .header("accept", "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());

            return Err(error_from_response(status.as_u16(), &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Transport(format!("Failed to parse Twilio response: {e}")))
    }
}

#[async_trait]
impl VoiceProvider for TwilioClient {
    async fn create_call(
        &self,
        to: &str,
        from: &str,
        url: &str,
    ) -> Result<CallResource, ProviderError> {
        self.post_form("Calls", &[("To", to), ("From", from), ("Url", url)])
            .await
    }

    async fn create_message(
        &self,
        body: &str,
        to: &str,
        from: &str,
        params: &[(String, String)],
    ) -> Result<MessageResource, ProviderError> {
        self.post_form("Messages", &message_form(body, to, from, params))
            .await
    }
}

/// Form fields of a message request, extra params after the required ones
fn message_form<'a>(
    body: &'a str,
    to: &'a str,
    from: &'a str,
    params: &'a [(String, String)],
) -> Vec<(&'a str, &'a str)> {
    let mut form = vec![("Body", body), ("To", to), ("From", from)];
    form.extend(
        params
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str())),
    );
    form
}

/// Maps a non-success Twilio answer to a structured error
fn error_from_response(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(api_error) => ProviderError::from_api_body(status, api_error),
        Err(_) => ProviderError::Api {
            status,
            code: None,
            message: format!("Twilio API returned error status {status}: {body}"),
            more_info: None,
        },
    }
}
