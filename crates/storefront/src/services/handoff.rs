//! Signed checkout-to-payment handoff tokens.
//!
//! The checkout page stages the pending order in the session and redirects to
//! `/payment?token=...`. The token names the staged order and its amount so
//! the payment page can refuse a stale or swapped order. Format:
//!
//! ```text
//! base64url(json payload) "." base64url(HMAC-SHA256(payload))
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// How long a token stays valid after issue.
pub const TOKEN_LIFETIME_MINUTES: i64 = 30;

/// Reasons a handoff token is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandoffError {
    #[error("token is not in payload.signature form")]
    Malformed,
    #[error("token is not valid base64url or JSON")]
    Encoding,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("signing key rejected: {0}")]
    Key(String),
}

/// Claims carried from checkout to the payment page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffToken {
    /// Reference of the staged order (also its receipt and order id).
    pub order_ref: String,
    /// Amount due, in paise.
    pub amount_paise: i64,
    /// Customer email.
    pub email: String,
    /// Unix timestamp of issue.
    pub issued_at: i64,
}

impl HandoffToken {
    /// New claims issued now.
    #[must_use]
    pub fn new(order_ref: impl Into<String>, amount_paise: i64, email: impl Into<String>) -> Self {
        Self {
            order_ref: order_ref.into(),
            amount_paise,
            email: email.into(),
            issued_at: Utc::now().timestamp(),
        }
    }
}

/// Signs and verifies handoff tokens with a server-held key.
#[derive(Clone)]
pub struct HandoffSigner {
    key: SecretString,
}

impl HandoffSigner {
    #[must_use]
    pub const fn new(key: SecretString) -> Self {
        Self { key }
    }

    fn mac(&self) -> Result<HmacSha256, HandoffError> {
        HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|e| HandoffError::Key(e.to_string()))
    }

    /// Serialize and sign a token.
    ///
    /// # Errors
    ///
    /// Returns `HandoffError::Key` if the signing key is rejected.
    pub fn sign(&self, token: &HandoffToken) -> Result<String, HandoffError> {
        // Serializing a struct of strings and integers cannot fail.
        let payload = serde_json::to_vec(token).unwrap_or_default();
        let encoded = URL_SAFE_NO_PAD.encode(&payload);

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{encoded}.{signature}"))
    }

    /// Verify a token against the current time.
    ///
    /// # Errors
    ///
    /// See [`HandoffSigner::verify_at`].
    pub fn verify(&self, raw: &str) -> Result<HandoffToken, HandoffError> {
        self.verify_at(raw, Utc::now())
    }

    /// Verify a token as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` when the token has no separator, `Encoding` when
    /// either half does not decode, `BadSignature` when the MAC differs
    /// (compared in constant time), and `Expired` once the token is older
    /// than [`TOKEN_LIFETIME_MINUTES`].
    pub fn verify_at(&self, raw: &str, now: DateTime<Utc>) -> Result<HandoffToken, HandoffError> {
        let (encoded, signature) = raw.trim().split_once('.').ok_or(HandoffError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| HandoffError::Encoding)?;

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| HandoffError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| HandoffError::Encoding)?;
        let token: HandoffToken =
            serde_json::from_slice(&payload).map_err(|_| HandoffError::Encoding)?;

        let issued_at =
            DateTime::<Utc>::from_timestamp(token.issued_at, 0).ok_or(HandoffError::Encoding)?;
        if now - issued_at > Duration::minutes(TOKEN_LIFETIME_MINUTES) {
            return Err(HandoffError::Expired);
        }

        Ok(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer(key: &str) -> HandoffSigner {
        HandoffSigner::new(SecretString::from(key.to_string()))
    }

    #[test]
    fn test_sign_then_verify() {
        let s = signer("k9#Lm2$Qz8!rT4@wX7^bN1&vC5*pY3");
        let token = HandoffToken::new("ord_1", 125_000, "asha@example.in");
        let raw = s.sign(&token).unwrap();
        assert_eq!(s.verify(&raw), Ok(token));
    }

    #[test]
    fn test_tampered_amount_is_rejected() {
        let s = signer("k9#Lm2$Qz8!rT4@wX7^bN1&vC5*pY3");
        let raw = s
            .sign(&HandoffToken::new("ord_1", 125_000, "asha@example.in"))
            .unwrap();
        let (_, signature) = raw.split_once('.').unwrap();

        let forged = HandoffToken::new("ord_1", 100, "asha@example.in");
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let forged_raw = format!("{forged_payload}.{signature}");

        assert_eq!(s.verify(&forged_raw), Err(HandoffError::BadSignature));
    }

    #[test]
    fn test_other_key_is_rejected() {
        let raw = signer("first-key-Qz8!rT4@wX7^bN1")
            .sign(&HandoffToken::new("o", 1, "a@b.co"))
            .unwrap();
        assert_eq!(
            signer("second-key-Lm2$vC5*pY3").verify(&raw),
            Err(HandoffError::BadSignature)
        );
    }

    #[test]
    fn test_expired_token() {
        let s = signer("k9#Lm2$Qz8!rT4@wX7^bN1&vC5*pY3");
        let token = HandoffToken::new("ord_1", 500, "a@b.co");
        let raw = s.sign(&token).unwrap();
        let issued = DateTime::<Utc>::from_timestamp(token.issued_at, 0).unwrap();

        assert!(s.verify_at(&raw, issued + Duration::minutes(29)).is_ok());
        assert_eq!(
            s.verify_at(&raw, issued + Duration::minutes(31)),
            Err(HandoffError::Expired)
        );
    }

    #[test]
    fn test_garbage_tokens() {
        let s = signer("k9#Lm2$Qz8!rT4@wX7^bN1&vC5*pY3");
        assert_eq!(s.verify("no-separator"), Err(HandoffError::Malformed));
        assert_eq!(s.verify("abc.!!!"), Err(HandoffError::Encoding));
        assert_eq!(s.verify("abc.YWJj"), Err(HandoffError::BadSignature));
    }
}
