//! Self-issued, time-limited bearer tokens for callback urls
//!
//! A token has the shape `payload.timestamp.signature`:
//!
//! - `payload` is a fresh random alphanumeric string
//! - `timestamp` is the issuance time in unix seconds, big-endian without
//!   leading zero bytes, URL-safe base64 without padding
//! - `signature` is HMAC-SHA256 over `payload.timestamp`, URL-safe base64
//!   without padding
//!
//! The HMAC key is derived from the secret key and a context label, so a
//! token minted for callbacks cannot be replayed against another signer that
//! shares the secret. Tokens are not single-use: any request inside the age
//! window is accepted.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = '.';

/// Signs and verifies callback tokens with one secret key and context label
pub struct TokenSigner {
    key: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret_key: &str, context_label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(context_label.as_bytes());
        hasher.update(b"signer");
        hasher.update(secret_key.as_bytes());

        Self {
            key: hasher.finalize().to_vec(),
        }
    }

    /// Random alphanumeric payload, never reused between calls
    pub fn generate_payload(len: usize) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    /// Signs `payload` stamped with the current time
    pub fn sign(&self, payload: &str) -> anyhow::Result<String> {
        self.sign_at(payload, chrono::Utc::now().timestamp())
    }

    /// Returns whether `token` carries a valid signature and is at most
    /// `max_age_secs` old. Malformed tokens are simply invalid.
    pub fn verify(&self, token: &str, max_age_secs: u64) -> bool {
        self.verify_at(token, max_age_secs, chrono::Utc::now().timestamp())
    }

    fn sign_at(&self, payload: &str, timestamp: i64) -> anyhow::Result<String> {
        let value = format!(
            "{payload}{SEPARATOR}{}",
            BASE64_URL_SAFE_NO_PAD.encode(timestamp_to_bytes(timestamp))
        );
        let signature = BASE64_URL_SAFE_NO_PAD.encode(self.mac(&value)?);

        Ok(format!("{value}{SEPARATOR}{signature}"))
    }

    fn verify_at(&self, token: &str, max_age_secs: u64, now: i64) -> bool {
        let Some((value, signature)) = token.rsplit_once(SEPARATOR) else {
            return false;
        };
        let Ok(signature) = BASE64_URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        let Ok(expected) = self.mac(value) else {
            return false;
        };
        if !bool::from(expected.as_slice().ct_eq(&signature)) {
            warn!("Callback token signature does not match");
            return false;
        }

        let Some(issued_at) = value
            .rsplit_once(SEPARATOR)
            .and_then(|(_, timestamp)| BASE64_URL_SAFE_NO_PAD.decode(timestamp).ok())
            .and_then(|bytes| timestamp_from_bytes(&bytes))
        else {
            return false;
        };

        let age = now - issued_at;
        if age < 0 || age as u64 > max_age_secs {
            warn!("Callback token expired: age {}s", age);
            return false;
        }

        true
    }

    fn mac(&self, value: &str) -> anyhow::Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| anyhow::anyhow!("Failed to create HMAC instance: {e}"))?;
        mac.update(value.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn timestamp_to_bytes(timestamp: i64) -> Vec<u8> {
    let bytes = timestamp.max(0).to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

fn timestamp_from_bytes(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() || bytes.len() > 8 {
        return None;
    }
    let value = bytes
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
    i64::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts;

    fn signer() -> TokenSigner {
        TokenSigner::new("secret", consts::TOKEN_CONTEXT_LABEL)
    }

    #[test]
    fn test_sign_then_verify() {
        let signer = signer();
        let token = signer.sign(&TokenSigner::generate_payload(32)).unwrap();
        assert!(signer.verify(&token, consts::TOKEN_MAX_AGE_SECS));
    }

    #[test]
    fn test_verify_twice_within_window() {
        let signer = signer();
        let token = signer.sign("payload").unwrap();
        assert!(signer.verify(&token, 600));
        assert!(signer.verify(&token, 600));
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = signer();
        let issued = 1_700_000_000;
        let token = signer.sign_at("payload", issued).unwrap();

        assert!(signer.verify_at(&token, 600, issued + 600));
        assert!(!signer.verify_at(&token, 600, issued + 601));
    }

    #[test]
    fn test_future_token_rejected() {
        let signer = signer();
        let token = signer.sign_at("payload", 1_700_000_100).unwrap();
        assert!(!signer.verify_at(&token, 600, 1_700_000_000));
    }

    #[test]
    fn test_other_secret_or_context_rejected() {
        let token = signer().sign("payload").unwrap();
        assert!(!TokenSigner::new("other", consts::TOKEN_CONTEXT_LABEL).verify(&token, 600));
        assert!(!TokenSigner::new("secret", "session").verify(&token, 600));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let signer = signer();
        let token = signer.sign("payload").unwrap();
        let tampered = token.replacen("payload", "paylOad", 1);
        assert!(!signer.verify(&tampered, 600));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let signer = signer();
        for token in ["", "password", ".", "..", "a.b.c", "a.!!!.c", "payload.AAAAAAAAAAAA.x"] {
            assert!(!signer.verify(token, 600), "accepted {token:?}");
        }
    }

    #[test]
    fn test_generate_payload_is_fresh() {
        let first = TokenSigner::generate_payload(32);
        let second = TokenSigner::generate_payload(32);
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_token_is_userinfo_safe() {
        let token = signer().sign(&TokenSigner::generate_payload(32)).unwrap();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        );
    }

    #[test]
    fn test_timestamp_bytes() {
        assert_eq!(timestamp_to_bytes(0), vec![0]);
        assert_eq!(timestamp_to_bytes(0x0102), vec![1, 2]);
        assert_eq!(timestamp_from_bytes(&[1, 2]), Some(0x0102));
        assert_eq!(timestamp_from_bytes(&[]), None);
        assert_eq!(timestamp_from_bytes(&[0xff; 8]), None);
    }
}
