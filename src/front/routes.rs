//! Route configuration for the demo application.

use super::{callback, server};
use crate::webhook::twilio::Endpoints;
use ntex::web;

/// Endpoint name of the TwiML view placed calls are pointed at
pub const TEST_CALL_ENDPOINT: &str = "test_call";
pub const TEST_CALL_PATH: &str = "/twiml";

/// Route table used to build absolute callback urls
pub fn endpoints(base_url: &str) -> Endpoints {
    Endpoints::new(base_url).route(TEST_CALL_ENDPOINT, TEST_CALL_PATH)
}

/// Configures the demo routes.
///
/// # Routes
/// - `GET /` - Call form
/// - `POST /` - Place a call or send a message
/// - `* /twiml` - TwiML for placed calls, any method reaches the callback
///   checks so non-`POST` requests get `405`
pub fn demo(cfg: &mut web::ServiceConfig) {
    cfg.service((server::index, server::place_call)).service(
        web::resource(TEST_CALL_PATH).to(callback::test_call_twiml),
    );
}
