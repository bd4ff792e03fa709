//! Razorpay API client.
//!
//! Creates gateway orders for the payment page and verifies the signature
//! the checkout widget returns on success.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;

use crate::config::RazorpayConfig;

/// Currency all studio orders are charged in.
pub const CURRENCY: &str = "INR";

/// Errors that can occur when interacting with the Razorpay API.
#[derive(Debug, Error)]
pub enum RazorpayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Payment signature did not verify.
    #[error("invalid payment signature")]
    InvalidSignature,
}

/// A gateway order, as returned by `POST /v1/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
}

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    description: Option<String>,
}

/// Razorpay API client.
#[derive(Clone)]
pub struct RazorpayClient {
    client: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: SecretString,
}

impl RazorpayClient {
    /// Create a new Razorpay client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &RazorpayConfig) -> Result<Self, RazorpayError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }

    /// Public key id handed to the checkout widget.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create an auto-captured INR order.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the response is not an order.
    #[instrument(skip(self))]
    pub async fn create_order(
        &self,
        amount_paise: i64,
        receipt: &str,
    ) -> Result<RazorpayOrder, RazorpayError> {
        let url = format!("{}/v1/orders", self.api_base);
        let body = CreateOrderRequest {
            amount: amount_paise,
            currency: CURRENCY,
            receipt,
            payment_capture: 1,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&raw)
                .ok()
                .and_then(|b| b.error.description)
                .unwrap_or(raw);
            return Err(RazorpayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let order: RazorpayOrder = response
            .json()
            .await
            .map_err(|e| RazorpayError::Parse(e.to_string()))?;

        tracing::info!(gateway_order_id = %order.id, "Razorpay order created");
        Ok(order)
    }

    /// Verify the `razorpay_signature` returned on payment success.
    ///
    /// The signature is hex HMAC-SHA256 of `{order_id}|{payment_id}` keyed
    /// with the key secret; comparison is constant time.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidSignature` if it does not match.
    pub fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), RazorpayError> {
        verify_signature(
            self.key_secret.expose_secret(),
            order_id,
            payment_id,
            signature,
        )
    }
}

fn payment_mac(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
) -> Result<Hmac<Sha256>, RazorpayError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key_secret.as_bytes())
        .map_err(|_| RazorpayError::InvalidSignature)?;
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    Ok(mac)
}

/// Expected signature for a payment, hex encoded.
///
/// # Errors
///
/// Returns `RazorpayError::InvalidSignature` if the key is rejected.
pub fn payment_signature(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
) -> Result<String, RazorpayError> {
    let mac = payment_mac(key_secret, order_id, payment_id)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn verify_signature(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), RazorpayError> {
    let provided = hex::decode(signature.trim()).map_err(|_| RazorpayError::InvalidSignature)?;

    payment_mac(key_secret, order_id, payment_id)?
        .verify_slice(&provided)
        .map_err(|_| RazorpayError::InvalidSignature)
}
