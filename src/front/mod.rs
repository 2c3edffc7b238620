//! Demo front end: a form that places test calls and the TwiML view those
//! calls fetch.

pub mod callback;
pub mod errors;
pub mod routes;
pub mod server;
pub mod templates;

use crate::{
    config::TwilioSettings,
    webhook::twilio::{Endpoints, Twilio},
};

pub struct AppState {
    pub twilio_settings: TwilioSettings,
    /// Connection pool shared by the per-request Twilio clients
    pub http_client: reqwest::Client,
    pub endpoints: Endpoints,
}

impl AppState {
    pub fn new(twilio_settings: TwilioSettings, base_url: &str) -> Self {
        Self {
            twilio_settings,
            http_client: reqwest::Client::new(),
            endpoints: routes::endpoints(base_url),
        }
    }

    /// Twilio context scoped to the current request
    pub fn twilio(&self) -> Twilio<'_> {
        Twilio::new(&self.twilio_settings, &self.http_client)
    }
}
