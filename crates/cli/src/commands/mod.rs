//! Command implementations.

pub mod admin;
pub mod items;
pub mod secrets;

use atelier_core::store::{ItemStoreClient, ItemStoreConfig, StoreError};
use atelier_core::{ItemTypeError, RecordError};
use secrecy::SecretString;
use thiserror::Error;

/// Errors from CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Item store request failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Unknown item type on the command line.
    #[error("{0}")]
    ItemType(#[from] ItemTypeError),

    /// Item did not read as its typed record.
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// No item with that id.
    #[error("Item not found: {0}")]
    NotFound(String),

    /// A destructive command was run without `--yes`.
    #[error("Refusing to {0} without --yes")]
    NotConfirmed(&'static str),

    /// Reading or writing a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON input or output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Password rejected or hashing failed.
    #[error("Password error: {0}")]
    Password(String),
}

/// Build an item store client from `ITEM_STORE_URL` and `ITEM_STORE_API_KEY`.
///
/// # Errors
///
/// Returns error if `ITEM_STORE_URL` is not set.
pub fn store_from_env() -> Result<ItemStoreClient, CliError> {
    dotenvy::dotenv().ok();

    let base_url =
        std::env::var("ITEM_STORE_URL").map_err(|_| CliError::MissingEnvVar("ITEM_STORE_URL"))?;
    let api_key = std::env::var("ITEM_STORE_API_KEY")
        .ok()
        .filter(|key| !key.is_empty())
        .map(SecretString::from);

    tracing::debug!(%base_url, "Using item store");
    Ok(ItemStoreClient::new(&ItemStoreConfig::new(base_url, api_key)))
}
