pub const TWILIO_SIGNATURE_HEADER: &str = "X-Twilio-Signature";
pub const TWIML_CONTENT_TYPE: &str = "text/xml";
pub const BASIC_AUTH_USERNAME: &str = "twilio";
pub const BASIC_AUTH_CHALLENGE: &str = "Basic realm=\"Login Required\"";

/// Salt mixed into the signing key so tokens minted here are useless elsewhere
pub const TOKEN_CONTEXT_LABEL: &str = "twilio";
pub const TOKEN_MAX_AGE_SECS: u64 = 600;
pub const TOKEN_PAYLOAD_LEN: usize = 32;

pub const TWILIO_API_BASE_URL: &str = "https://api.twilio.com";
pub const TWILIO_API_VERSION: &str = "2010-04-01";

/// Twilio magic test number, see https://www.twilio.com/docs/iam/test-credentials
pub const DEFAULT_NUMBER: &str = "+15005550006";

pub const DEMO_CALL_TEXT: &str = "This is a voice call from Twilio!";
pub const DEMO_SMS_TEXT: &str = "This is an SMS message from Twilio!";
