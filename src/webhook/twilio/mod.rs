//! Twilio webhook integration module
//!
//! Everything needed to receive genuine Twilio callbacks and to start the
//! outbound calls that trigger them.
//!
//! ## Submodules
//!
//! - [`security`] - `X-Twilio-Signature` validation
//! - [`token`] - Self-issued, time-limited callback tokens
//! - [`guard`] - Callback verification wrapped around TwiML views
//! - [`outbound`] - Outbound calls and messages with signed callback urls
//! - [`client`] - Twilio REST API client
//! - [`twiml`] - TwiML document builder and HTTP adapter
//! - [`schemas`] - REST resources returned by Twilio
//! - [`errors`] - Callback rejections and provider failures
//!
//! ## Request scope
//!
//! A [`Twilio`] context is built for every incoming request from the shared,
//! read-only [`TwilioSettings`]. Its REST client, signature validator and
//! token signer are created on first use and dropped with the request.

pub mod client;
pub mod errors;
pub mod guard;
pub mod outbound;
pub mod schemas;
pub mod security;
pub mod token;
pub mod twiml;

use crate::{config::TwilioSettings, consts};
use client::{ImplVoiceProvider, TwilioClient, VoiceProvider};
use security::RequestValidator;
use std::cell::OnceCell;
use token::TokenSigner;

// Re-export commonly used items for convenience
pub use errors::{CallbackError, ProviderError};
pub use guard::{CallbackRequest, TwimlView, twiml};
pub use outbound::{CallOptions, EndpointResolver, Endpoints};
pub use twiml::{TwimlResponse, VoiceResponse};

/// Request-scoped access to the Twilio client, validator and signer
pub struct Twilio<'a> {
    settings: &'a TwilioSettings,
    http: Option<reqwest::Client>,
    client: OnceCell<ImplVoiceProvider>,
    validator: OnceCell<RequestValidator>,
    signer: OnceCell<Option<TokenSigner>>,
}

impl<'a> Twilio<'a> {
    /// Creates the context for one request on top of a shared connection pool
    pub fn new(settings: &'a TwilioSettings, http: &reqwest::Client) -> Self {
        Self {
            settings,
            http: Some(http.clone()),
            client: OnceCell::new(),
            validator: OnceCell::new(),
            signer: OnceCell::new(),
        }
    }

    /// Creates the context with an already built provider client
    pub fn with_provider(settings: &'a TwilioSettings, provider: ImplVoiceProvider) -> Self {
        Self {
            settings,
            http: None,
            client: OnceCell::from(provider),
            validator: OnceCell::new(),
            signer: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &TwilioSettings {
        self.settings
    }

    /// Trusted mode skips every callback check and never signs callback urls
    pub fn is_trusted(&self) -> bool {
        self.settings.trusted_mode
    }

    /// Twilio REST client for this request
    pub fn client(&self) -> &dyn VoiceProvider {
        &**self.client.get_or_init(|| {
            Box::new(TwilioClient::new(
                self.http.clone().unwrap_or_default(),
                self.settings,
            ))
        })
    }

    /// Signature validator keyed with the auth token
    pub fn validator(&self) -> &RequestValidator {
        self.validator
            .get_or_init(|| RequestValidator::new(&self.settings.auth_token))
    }

    /// Token signer, `None` when no secret key is configured
    pub fn signer(&self) -> Option<&TokenSigner> {
        self.signer
            .get_or_init(|| {
                self.settings
                    .secret_key
                    .as_deref()
                    .map(|secret| TokenSigner::new(secret, consts::TOKEN_CONTEXT_LABEL))
            })
            .as_ref()
    }

    /// Mints a fresh callback token, fails when no secret key is configured
    pub fn sign_token(&self) -> Result<String, ProviderError> {
        let signer = self.signer().ok_or(ProviderError::Disabled)?;
        signer
            .sign(&TokenSigner::generate_payload(
                self.settings.token_payload_len,
            ))
            .map_err(|e| ProviderError::Signing(e.to_string()))
    }
}
