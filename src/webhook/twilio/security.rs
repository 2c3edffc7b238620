//! Signature verification for incoming Twilio webhook requests
//!
//! Twilio signs every callback with the account auth token and sends the result
//! in the `X-Twilio-Signature` header. This ensures that requests actually
//! originate from Twilio and haven't been tampered with.
//!
//! # Signature Algorithm
//!
//! 1. Take the full URL Twilio requested, query string included
//! 2. For form-encoded callbacks, sort the POST parameters by name and append
//!    each name immediately followed by its value
//! 3. Compute HMAC-SHA1 of the resulting string using the auth token
//! 4. Base64 encode the digest and compare with the header
//!
//! JSON callbacks carry a `bodySHA256` query parameter instead: the form step
//! is skipped and the hex SHA-256 of the raw body must equal that parameter.
//!
//! # Important Notes
//!
//! - The comparison must be constant-time to prevent timing attacks
//! - Twilio may or may not include the default port when signing, so both
//!   forms of the URL are tried

use base64::{Engine, prelude::BASE64_STANDARD};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha1 = Hmac<Sha1>;

const BODY_HASH_PARAM: &str = "bodySHA256";

/// Validates `X-Twilio-Signature` headers with one account auth token
pub struct RequestValidator {
    auth_token: String,
}

impl RequestValidator {
    pub fn new(auth_token: &str) -> Self {
        Self {
            auth_token: auth_token.to_string(),
        }
    }

    /// Computes the base64 signature Twilio would send for `url` and `params`
    pub fn compute_signature(&self, url: &str, params: &[(String, String)]) -> Option<String> {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut mac = HmacSha1::new_from_slice(self.auth_token.as_bytes()).ok()?;
        mac.update(url.as_bytes());
        for (name, value) in sorted {
            mac.update(name.as_bytes());
            mac.update(value.as_bytes());
        }

        Some(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Verifies a callback signature
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL the request was sent to
    /// * `params` - The decoded form fields of the request body
    /// * `body` - The raw request body, only read for `bodySHA256` callbacks
    /// * `signature` - The `X-Twilio-Signature` header value, empty when missing
    ///
    /// # Returns
    ///
    /// * `true` if the signature matches either port form of the URL
    /// * `false` otherwise, including an empty header or unparsable URL
    pub fn validate(
        &self,
        url: &str,
        params: &[(String, String)],
        body: &[u8],
        signature: &str,
    ) -> bool {
        if signature.is_empty() {
            warn!("Missing X-Twilio-Signature header");
            return false;
        }

        let parsed = match url::Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Cannot parse callback url for signature check: {}", e);
                return false;
            }
        };

        let body_hash = parsed
            .query_pairs()
            .find(|(name, _)| *name == BODY_HASH_PARAM)
            .map(|(_, value)| value.into_owned());

        let signed_params: &[(String, String)] = match body_hash {
            Some(ref expected) => {
                if !verify_body_hash(body, expected) {
                    warn!("Twilio bodySHA256 does not match the request body");
                    return false;
                }
                &[]
            }
            None => params,
        };

        let is_valid = url_variants(&parsed, url).iter().any(|candidate| {
            self.compute_signature(candidate, signed_params)
                .is_some_and(|computed| bool::from(computed.as_bytes().ct_eq(signature.as_bytes())))
        });

        if !is_valid {
            warn!("Twilio signature verification failed: signatures do not match");
        }

        is_valid
    }
}

fn verify_body_hash(body: &[u8], expected_hex: &str) -> bool {
    let computed = hex::encode(Sha256::digest(body));
    computed
        .as_bytes()
        .ct_eq(expected_hex.to_ascii_lowercase().as_bytes())
        .into()
}

/// The URL as received, without the default port and with the default port
fn url_variants(parsed: &url::Url, raw: &str) -> Vec<String> {
    // `Url` drops a default port while parsing
    let mut variants = vec![raw.to_string(), parsed.to_string()];

    if let (Some(host), Some(port)) = (parsed.host_str(), parsed.port_or_known_default()) {
        let mut with_port = format!("{}://", parsed.scheme());
        if !parsed.username().is_empty() {
            with_port.push_str(parsed.username());
            if let Some(password) = parsed.password() {
                with_port.push(':');
                with_port.push_str(password);
            }
            with_port.push('@');
        }
        with_port.push_str(&format!("{host}:{port}{}", parsed.path()));
        if let Some(query) = parsed.query() {
            with_port.push('?');
            with_port.push_str(query);
        }
        if let Some(fragment) = parsed.fragment() {
            with_port.push('#');
            with_port.push_str(fragment);
        }
        variants.push(with_port);
    }

    variants.sort();
    variants.dedup();
    variants
}
