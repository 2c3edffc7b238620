//! Application configuration management with security considerations.
//!
//! All values are read once from the environment at startup and then shared
//! read-only for the lifetime of the process.
//!
//! # Security Notes
//! - Sensitive fields are clearly marked and should never be logged
//! - Production environments should use secure secret management systems

use crate::consts;
use anyhow::bail;
use envconfig::Envconfig;

/// Application configuration with security-aware field management.
///
/// # Security Requirements
/// - All `SENSITIVE` fields must be stored securely (encrypted at rest)
/// - Never log or expose sensitive values
/// - Rotate sensitive credentials regularly
#[derive(Envconfig, Clone)]
pub struct AppConfig {
    /// Environment name to deploy the app (NON-SENSITIVE)
    /// Values: "local", "dev", "staging", "prod"
    #[envconfig(from = "ENV", default = "local")]
    pub env: String,

    /// Host address for web server binding (NON-SENSITIVE)
    #[envconfig(from = "WEB_SERVER_HOST", default = "0.0.0.0")]
    pub web_server_host: String,

    /// Port for web server binding (NON-SENSITIVE)
    #[envconfig(from = "WEB_SERVER_PORT", default = "5000")]
    pub web_server_port: u16,

    /// Externally reachable base url handed to Twilio in callback urls (NON-SENSITIVE)
    /// Example: "https://calls.example.com"
    #[envconfig(from = "PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,

    /// Path to SSL private key file (SENSITIVE PATH)
    #[envconfig(from = "PRIVATE_KEY_PATH", default = "server.key")]
    pub private_key_path: String,

    /// Path to SSL certificate file (NON-SENSITIVE)
    #[envconfig(from = "CERTIFICATE_PATH", default = "server.crt")]
    pub certificate_path: String,

    /// Twilio account SID (SEMI-SENSITIVE)
    #[envconfig(from = "TWILIO_ACCOUNT_SID")]
    pub twilio_account_sid: Option<String>,

    /// Twilio API key SID used as REST username (SEMI-SENSITIVE)
    /// Falls back to the account SID when absent
    #[envconfig(from = "TWILIO_AUTH_SID")]
    pub twilio_auth_sid: Option<String>,

    /// 🔒 SENSITIVE: Twilio auth token, signs every callback Twilio sends us
    #[envconfig(from = "TWILIO_AUTH_TOKEN")]
    pub twilio_auth_token: String,

    /// Default originating phone number (NON-SENSITIVE)
    #[envconfig(from = "TWILIO_FROM", default = "+15005550006")]
    pub twilio_from: String,

    /// 🔒 SENSITIVE: Secret key for self-issued callback tokens
    /// Absence disables the basic-auth layer on callbacks
    #[envconfig(from = "SECRET_KEY")]
    pub secret_key: Option<String>,

    /// Skip every callback check. Local development and tests only
    #[envconfig(from = "TWILIO_TRUSTED_MODE", default = "false")]
    pub trusted_mode: bool,

    /// Seconds a self-issued callback token stays valid
    #[envconfig(from = "TWILIO_TOKEN_MAX_AGE", default = "600")]
    pub token_max_age: u64,

    /// Length of the random alphanumeric payload inside each token
    #[envconfig(from = "TWILIO_TOKEN_PAYLOAD_LEN", default = "32")]
    pub token_payload_len: usize,

    /// Twilio REST API root, overridable for test doubles
    #[envconfig(from = "TWILIO_API_BASE_URL", default = "https://api.twilio.com")]
    pub twilio_api_base_url: String,

    /// 🔒 SENSITIVE: Logfire write token, console logging is used when absent
    #[envconfig(from = "LOGFIRE_TOKEN")]
    pub logfire_token: Option<String>,
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_prod(&self) -> bool {
        self.env.to_lowercase() == "prod"
    }

    /// Gets the appropriate protocol (HTTP/HTTPS) based on environment
    pub fn web_server_protocol(&self) -> String {
        if self.is_prod() {
            return "https".into();
        }
        "http".into()
    }

    /// Constructs the complete base URL for the application
    pub fn base_url(&self) -> String {
        if let Some(public) = &self.public_base_url {
            return public.trim_end_matches('/').to_string();
        }

        format!(
            "{protocol}://{host}:{port}",
            protocol = self.web_server_protocol(),
            host = self.web_server_host,
            port = self.web_server_port
        )
    }

    /// Builds the immutable Twilio settings shared by every request
    pub fn twilio_settings(&self) -> anyhow::Result<TwilioSettings> {
        let (account_sid, auth_sid) =
            match (&self.twilio_account_sid, &self.twilio_auth_sid) {
                (Some(account), Some(auth)) => (account.clone(), auth.clone()),
                (Some(account), None) => (account.clone(), account.clone()),
                (None, Some(auth)) => (auth.clone(), auth.clone()),
                (None, None) => bail!("TWILIO_ACCOUNT_SID or TWILIO_AUTH_SID must be set"),
            };

        if self.token_payload_len < consts::TOKEN_PAYLOAD_LEN {
            bail!(
                "TWILIO_TOKEN_PAYLOAD_LEN must be at least {}",
                consts::TOKEN_PAYLOAD_LEN
            );
        }

        Ok(TwilioSettings {
            account_sid,
            auth_sid,
            auth_token: self.twilio_auth_token.clone(),
            default_from: self.twilio_from.clone(),
            secret_key: self.secret_key.clone().filter(|key| !key.is_empty()),
            trusted_mode: self.trusted_mode,
            token_max_age: self.token_max_age,
            token_payload_len: self.token_payload_len,
            api_base_url: self.twilio_api_base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Credentials and policy for the Twilio layer, immutable per process
#[derive(Clone, Debug)]
pub struct TwilioSettings {
    pub account_sid: String,
    /// REST username, equal to `account_sid` unless an API key is configured
    pub auth_sid: String,
    /// 🔒 SENSITIVE
    pub auth_token: String,
    pub default_from: String,
    /// 🔒 SENSITIVE
    pub secret_key: Option<String>,
    pub trusted_mode: bool,
    pub token_max_age: u64,
    pub token_payload_len: usize,
    pub api_base_url: String,
}

impl TwilioSettings {
    pub fn new(account_sid: &str, auth_token: &str, default_from: &str) -> Self {
        Self {
            account_sid: account_sid.to_string(),
            auth_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            default_from: default_from.to_string(),
            secret_key: None,
            trusted_mode: false,
            token_max_age: consts::TOKEN_MAX_AGE_SECS,
            token_payload_len: consts::TOKEN_PAYLOAD_LEN,
            api_base_url: consts::TWILIO_API_BASE_URL.to_string(),
        }
    }

    pub fn with_secret_key(mut self, secret_key: &str) -> Self {
        self.secret_key = Some(secret_key.to_string());
        self
    }

    pub fn with_trusted_mode(mut self, trusted_mode: bool) -> Self {
        self.trusted_mode = trusted_mode;
        self
    }

    /// Whether callback urls carry a signed token and callbacks require one
    pub fn bearer_token_enabled(&self) -> bool {
        self.secret_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::init_from_hashmap(&env).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[
            ("TWILIO_ACCOUNT_SID", "sid"),
            ("TWILIO_AUTH_TOKEN", "token"),
        ]);
        assert_eq!(config.twilio_from, consts::DEFAULT_NUMBER);
        assert_eq!(config.token_max_age, 600);
        assert!(!config.trusted_mode);
        assert_eq!(config.base_url(), "http://0.0.0.0:5000");

        let settings = config.twilio_settings().unwrap();
        assert_eq!(settings.auth_sid, "sid");
        assert!(!settings.bearer_token_enabled());
    }

    #[test]
    fn test_auth_sid_fallbacks() {
        let config = config_from(&[("TWILIO_AUTH_SID", "SK1"), ("TWILIO_AUTH_TOKEN", "token")]);
        let settings = config.twilio_settings().unwrap();
        assert_eq!(settings.account_sid, "SK1");
        assert_eq!(settings.auth_sid, "SK1");

        let config = config_from(&[
            ("TWILIO_ACCOUNT_SID", "AC1"),
            ("TWILIO_AUTH_SID", "SK1"),
            ("TWILIO_AUTH_TOKEN", "token"),
        ]);
        let settings = config.twilio_settings().unwrap();
        assert_eq!(settings.account_sid, "AC1");
        assert_eq!(settings.auth_sid, "SK1");

        let config = config_from(&[("TWILIO_AUTH_TOKEN", "token")]);
        assert!(config.twilio_settings().is_err());
    }

    #[test]
    fn test_secret_key_and_base_url() {
        let config = config_from(&[
            ("TWILIO_ACCOUNT_SID", "sid"),
            ("TWILIO_AUTH_TOKEN", "token"),
            ("SECRET_KEY", "secret"),
            ("PUBLIC_BASE_URL", "https://calls.example.com/"),
        ]);
        assert_eq!(config.base_url(), "https://calls.example.com");
        assert!(config.twilio_settings().unwrap().bearer_token_enabled());

        let config = config_from(&[
            ("TWILIO_ACCOUNT_SID", "sid"),
            ("TWILIO_AUTH_TOKEN", "token"),
            ("SECRET_KEY", ""),
        ]);
        assert!(!config.twilio_settings().unwrap().bearer_token_enabled());
    }

    #[test]
    fn test_short_payload_rejected() {
        let config = config_from(&[
            ("TWILIO_ACCOUNT_SID", "sid"),
            ("TWILIO_AUTH_TOKEN", "token"),
            ("TWILIO_TOKEN_PAYLOAD_LEN", "8"),
        ]);
        assert!(config.twilio_settings().is_err());
    }
}
