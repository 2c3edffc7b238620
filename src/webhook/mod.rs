//! Webhook handlers for external integrations
//!
//! ## Modules
//!
//! - [`twilio`] - Twilio callback verification, outbound calls and TwiML
//!
//! Twilio reaches the application only through urls the application handed
//! out itself, so every integration here verifies who is calling before any
//! view runs.

pub mod twilio;
