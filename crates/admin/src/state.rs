//! Application state shared across handlers.

use std::sync::Arc;

use atelier_core::mail::{MailClient, MailError};
use atelier_core::store::{ItemStoreClient, StoreError};
use secrecy::SecretString;

use crate::config::{AdminConfig, StorageCredentials};
use crate::services::StatusNotifier;
use crate::storage::{ObjectStorage, StorageError};

/// Secret names holding storage credentials in the item store.
const ACCESS_KEY_SECRET: &str = "s3_access_key_id";
const SECRET_KEY_SECRET: &str = "s3_secret_access_key";

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("mail client: {0}")]
    Mail(#[from] MailError),
    #[error("object storage: {0}")]
    Storage(#[from] StorageError),
    #[error("reading storage credentials: {0}")]
    Store(#[from] StoreError),
    #[error("item store has no secret named {0}")]
    MissingSecret(&'static str),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    store: ItemStoreClient,
    mail: MailClient,
    notifier: StatusNotifier,
    storage: ObjectStorage,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Storage credentials missing from the config are fetched from the item
    /// store's secrets endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if a client cannot be built or the credentials
    /// cannot be resolved.
    pub async fn new(config: AdminConfig) -> Result<Self, StateError> {
        let store = ItemStoreClient::new(&config.item_store);
        let mail = MailClient::new(&config.mail)?;
        let notifier = StatusNotifier::new(mail.clone(), config.studio_name.clone());

        let credentials = match &config.storage.credentials {
            Some(credentials) => credentials.clone(),
            None => credentials_from_store(&store).await?,
        };
        let storage = ObjectStorage::new(&config.storage, credentials)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                mail,
                notifier,
                storage,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &ItemStoreClient {
        &self.inner.store
    }

    #[must_use]
    pub fn mail(&self) -> &MailClient {
        &self.inner.mail
    }

    #[must_use]
    pub fn notifier(&self) -> &StatusNotifier {
        &self.inner.notifier
    }

    #[must_use]
    pub fn storage(&self) -> &ObjectStorage {
        &self.inner.storage
    }
}

async fn credentials_from_store(store: &ItemStoreClient) -> Result<StorageCredentials, StateError> {
    tracing::info!("Storage credentials not configured, reading from item store secrets");
    let mut secrets = store
        .get_secrets(&[ACCESS_KEY_SECRET, SECRET_KEY_SECRET])
        .await?;

    let access_key_id = secrets
        .remove(ACCESS_KEY_SECRET)
        .filter(|v| !v.is_empty())
        .ok_or(StateError::MissingSecret(ACCESS_KEY_SECRET))?;
    let secret_access_key = secrets
        .remove(SECRET_KEY_SECRET)
        .filter(|v| !v.is_empty())
        .ok_or(StateError::MissingSecret(SECRET_KEY_SECRET))?;

    Ok(StorageCredentials {
        access_key_id,
        secret_access_key: SecretString::from(secret_access_key),
    })
}
