//! Application state shared across handlers.

use std::sync::Arc;

use atelier_core::AccountConfig;
use atelier_core::mail::{MailClient, MailError};
use atelier_core::store::{ItemStoreClient, StoreError};

use crate::config::StorefrontConfig;
use crate::services::{HandoffSigner, Notifier, RazorpayClient, RazorpayError};

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("mail client: {0}")]
    Mail(#[from] MailError),
    #[error("razorpay client: {0}")]
    Razorpay(#[from] RazorpayError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like API clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: ItemStoreClient,
    razorpay: RazorpayClient,
    notifier: Notifier,
    handoff: HandoffSigner,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let store = ItemStoreClient::new(&config.item_store);
        let razorpay = RazorpayClient::new(&config.razorpay)?;
        let mail = MailClient::new(&config.mail)?;
        let notifier = Notifier::new(mail, config.studio.clone(), config.base_url.clone());
        let handoff = HandoffSigner::new(config.session_secret.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                razorpay,
                notifier,
                handoff,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the item store client.
    #[must_use]
    pub fn store(&self) -> &ItemStoreClient {
        &self.inner.store
    }

    /// Get a reference to the Razorpay client.
    #[must_use]
    pub fn razorpay(&self) -> &RazorpayClient {
        &self.inner.razorpay
    }

    /// Get a reference to the order email sender.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Get a reference to the handoff token signer.
    #[must_use]
    pub fn handoff(&self) -> &HandoffSigner {
        &self.inner.handoff
    }

    /// Studio settings from the item store, or defaults when none are saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn account_config(&self) -> Result<AccountConfig, StoreError> {
        let configs = self.store().records::<AccountConfig>().await?;
        Ok(configs.into_iter().next().unwrap_or_default())
    }
}
