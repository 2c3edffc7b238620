//! # ntex-twilio
//!
//! Twilio integration for ntex web applications:
//!
//! - verify that inbound callbacks really come from Twilio and belong to a
//!   call this application started ([`webhook::twilio::guard`])
//! - start outbound calls whose callback urls carry a self-issued,
//!   time-limited token ([`webhook::twilio::outbound`])
//! - answer callbacks with TwiML documents ([`webhook::twilio::twiml`])
//!
//! The `twilio-demo` binary wires these into a small form that places test
//! calls.

pub mod config;
pub mod consts;
pub mod front;
pub mod logger;
pub mod metric;
pub mod webhook;
