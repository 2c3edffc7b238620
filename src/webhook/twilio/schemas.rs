//! # Twilio REST Schemas
//!
//! Resources returned by the Twilio REST API after a call or message has been
//! created. Only the fields the application reads are modeled, everything
//! else in the JSON body is ignored.

use serde::{Deserialize, Serialize};

/// A call in progress, as returned by `POST /Accounts/{sid}/Calls.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResource {
    /// Unique call identifier (`CA...`)
    pub sid: String,
    pub account_sid: Option<String>,
    pub to: Option<String>,
    pub from: Option<String>,
    /// e.g. "queued", "ringing", "in-progress"
    pub status: Option<String>,
    pub direction: Option<String>,
    pub date_created: Option<String>,
    pub uri: Option<String>,
}

/// A message accepted by `POST /Accounts/{sid}/Messages.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResource {
    /// Unique message identifier (`SM...`)
    pub sid: String,
    pub account_sid: Option<String>,
    pub to: Option<String>,
    pub from: Option<String>,
    pub body: Option<String>,
    /// e.g. "queued", "sent", "failed"
    pub status: Option<String>,
    pub num_segments: Option<String>,
    pub date_created: Option<String>,
    pub uri: Option<String>,
}
