//! Item store REST client.
//!
//! The item store is a generic key-value backend holding every record the
//! studio has. Endpoints (relative to the configured base URL):
//!
//! ```text
//! GET    itemsbytype/{type}       all items of a type
//! POST   items                    upsert an item (by id)
//! DELETE removeitem/{id}          delete an item
//! GET    items/id/{id}            one item by id
//! GET    items/{slug}             one item by slug
//! POST   items/filter2column      items matching two column/value pairs
//! POST   getsecrets               named secrets
//! ```
//!
//! `items_by_type` results are cached with `moka` (60 second TTL by default);
//! writes through this client invalidate the affected entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::types::{CatalogEntry, Item, ItemId, ItemType, Record, RecordError};

/// Default lifetime of cached `items_by_type` responses.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Errors that can occur when talking to the item store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body was not the expected JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An item did not match the requested record type.
    #[error("Record error: {0}")]
    Record(#[from] RecordError),
}

/// Connection settings for the item store.
#[derive(Clone)]
pub struct ItemStoreConfig {
    /// Base URL, e.g. `https://store.example.com/api`.
    pub base_url: String,
    /// Optional bearer token.
    pub api_key: Option<SecretString>,
    /// Lifetime of cached listings.
    pub cache_ttl: Duration,
}

impl ItemStoreConfig {
    /// Settings with the default cache TTL.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<SecretString>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl std::fmt::Debug for ItemStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemStoreConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

/// Two-column equality filter (`POST items/filter2column`), scoped to one
/// item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFilter {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub column1: String,
    pub value1: String,
    pub column2: String,
    pub value2: String,
}

impl ItemFilter {
    /// Items of `item_type` matching both column/value pairs.
    #[must_use]
    pub fn new(
        item_type: ItemType,
        (column1, value1): (&str, &str),
        (column2, value2): (&str, &str),
    ) -> Self {
        Self {
            item_type,
            column1: column1.to_string(),
            value1: value1.to_string(),
            column2: column2.to_string(),
            value2: value2.to_string(),
        }
    }

    /// Items of `item_type` whose `column` equals `value`.
    ///
    /// The second pair repeats the type so stores that ignore the `type`
    /// key still scope the match.
    #[must_use]
    pub fn typed(item_type: ItemType, column: &str, value: &str) -> Self {
        Self::new(item_type, (column, value), ("type", item_type.as_str()))
    }
}

/// List responses come back either bare or wrapped.
#[derive(Deserialize)]
#[serde(untagged)]
enum ItemsResponse {
    Bare(Vec<Item>),
    Wrapped { items: Vec<Item> },
    Data { data: Vec<Item> },
}

impl ItemsResponse {
    fn into_items(self) -> Vec<Item> {
        match self {
            Self::Bare(items) | Self::Wrapped { items } | Self::Data { data: items } => items,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemResponse {
    Bare(Box<Item>),
    Wrapped { item: Option<Box<Item>> },
    Empty(Option<()>),
}

#[derive(Serialize)]
struct SecretsRequest<'a> {
    keys: &'a [&'a str],
}

/// Client for the item store.
///
/// Cheap to clone; clones share the HTTP connection pool and cache.
#[derive(Clone)]
pub struct ItemStoreClient {
    inner: Arc<ItemStoreClientInner>,
}

struct ItemStoreClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    cache: Cache<ItemType, Arc<Vec<Item>>>,
}

impl ItemStoreClient {
    /// Create a new item store client.
    #[must_use]
    pub fn new(config: &ItemStoreConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(ItemType::ALL.len() as u64)
            .time_to_live(config.cache_ttl)
            .build();

        Self {
            inner: Arc::new(ItemStoreClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.trim_end_matches('/').to_string(),
                api_key: config.api_key.clone(),
                cache,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.inner.base_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.inner.client.request(method, self.url(path));
        match &self.inner.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and return the body of a successful response.
    ///
    /// `Ok(None)` means 404.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Option<String>, StoreError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }
        Ok(Some(body))
    }

    fn parse_items(body: &str) -> Result<Vec<Item>, StoreError> {
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str::<ItemsResponse>(body)
            .map(ItemsResponse::into_items)
            .map_err(|e| StoreError::Parse(e.to_string()))
    }

    fn parse_item(body: &str) -> Result<Option<Item>, StoreError> {
        if body.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<ItemResponse>(body) {
            Ok(ItemResponse::Bare(item)) => Ok(Some(*item)),
            Ok(ItemResponse::Wrapped { item }) => Ok(item.map(|i| *i)),
            Ok(ItemResponse::Empty(_)) => Ok(None),
            Err(e) => Err(StoreError::Parse(e.to_string())),
        }
    }

    // =========================================================================
    // Raw item operations
    // =========================================================================

    /// All items of one type.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a list of items.
    #[instrument(skip(self), fields(item_type = %item_type))]
    pub async fn items_by_type(&self, item_type: ItemType) -> Result<Vec<Item>, StoreError> {
        if let Some(items) = self.inner.cache.get(&item_type).await {
            debug!("Cache hit for item type");
            return Ok(items.as_ref().clone());
        }

        let path = format!("itemsbytype/{}", item_type.as_str());
        let body = self
            .send(self.request(reqwest::Method::GET, &path))
            .await?
            .unwrap_or_default();
        let items: Vec<Item> = Self::parse_items(&body)?
            .into_iter()
            .filter(|item| item.item_type == item_type)
            .collect();

        self.inner
            .cache
            .insert(item_type, Arc::new(items.clone()))
            .await;
        Ok(items)
    }

    /// Create or replace an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    #[instrument(skip(self, item), fields(id = %item.id, item_type = %item.item_type))]
    pub async fn save_item(&self, item: &Item) -> Result<(), StoreError> {
        let builder = self.request(reqwest::Method::POST, "items").json(item);
        let result = self.send(builder).await?;
        self.inner.cache.invalidate(&item.item_type).await;
        if result.is_none() {
            return Err(StoreError::Api {
                status: 404,
                message: "items endpoint not found".to_string(),
            });
        }
        Ok(())
    }

    /// Delete an item by id. Deleting a missing item is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the delete.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_item(&self, id: &ItemId) -> Result<(), StoreError> {
        let path = format!("removeitem/{}", urlencoding::encode(id.as_str()));
        self.send(self.request(reqwest::Method::DELETE, &path))
            .await?;
        // The id alone does not tell us the type.
        self.inner.cache.invalidate_all();
        Ok(())
    }

    /// One item by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not an item.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn get_item(&self, id: &ItemId) -> Result<Option<Item>, StoreError> {
        let path = format!("items/id/{}", urlencoding::encode(id.as_str()));
        match self.send(self.request(reqwest::Method::GET, &path)).await? {
            Some(body) => Self::parse_item(&body),
            None => Ok(None),
        }
    }

    /// One item by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not an item.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Item>, StoreError> {
        let path = format!("items/{}", urlencoding::encode(slug));
        match self.send(self.request(reqwest::Method::GET, &path)).await? {
            Some(body) => Self::parse_item(&body),
            None => Ok(None),
        }
    }

    /// Items matching a two-column filter. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a list of items.
    #[instrument(skip(self))]
    pub async fn filter_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, StoreError> {
        let builder = self
            .request(reqwest::Method::POST, "items/filter2column")
            .json(filter);
        let body = self.send(builder).await?.unwrap_or_default();
        Self::parse_items(&body)
    }

    /// Fetch named secrets. Missing names are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a JSON object.
    #[instrument(skip(self))]
    pub async fn get_secrets(&self, keys: &[&str]) -> Result<HashMap<String, String>, StoreError> {
        let builder = self
            .request(reqwest::Method::POST, "getsecrets")
            .json(&SecretsRequest { keys });
        let body = self.send(builder).await?.unwrap_or_default();
        if body.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let values: HashMap<String, serde_json::Value> =
            serde_json::from_str(&body).map_err(|e| StoreError::Parse(e.to_string()))?;
        Ok(values
            .into_iter()
            .filter_map(|(k, v)| match v {
                serde_json::Value::String(s) => Some((k, s)),
                serde_json::Value::Null => None,
                other => Some((k, other.to_string())),
            })
            .collect())
    }

    // =========================================================================
    // Typed helpers
    // =========================================================================

    /// All records of type `R`. Items that fail to convert are logged and
    /// skipped so one bad record does not take down a listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing request fails.
    pub async fn records<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        let items = self.items_by_type(R::TYPE).await?;
        Ok(convert_lenient(items))
    }

    /// Catalog entries of one catalog type, malformed items skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing request fails.
    pub async fn catalog(&self, item_type: ItemType) -> Result<Vec<CatalogEntry>, StoreError> {
        let items = self.items_by_type(item_type).await?;
        Ok(items
            .into_iter()
            .filter_map(|item| match CatalogEntry::from_item(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed catalog item");
                    None
                }
            })
            .collect())
    }

    /// Records of type `R` whose `column` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter request fails.
    pub async fn find_records<R: Record>(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Vec<R>, StoreError> {
        let items = self
            .filter_items(&ItemFilter::typed(R::TYPE, column, value))
            .await?;
        Ok(convert_lenient(
            items.into_iter().filter(|i| i.item_type == R::TYPE).collect(),
        ))
    }

    /// One record of type `R` by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the item is not an `R`.
    pub async fn record<R: Record>(&self, id: &ItemId) -> Result<Option<R>, StoreError> {
        match self.get_item(id).await? {
            Some(item) => Ok(Some(R::from_item(item)?)),
            None => Ok(None),
        }
    }

    /// One record of type `R` by slug. Items of another type sharing the
    /// slug are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the item is malformed.
    pub async fn record_by_slug<R: Record>(&self, slug: &str) -> Result<Option<R>, StoreError> {
        match self.get_by_slug(slug).await? {
            Some(item) if item.item_type == R::TYPE => Ok(Some(R::from_item(item)?)),
            _ => Ok(None),
        }
    }

    /// Save a typed record.
    ///
    /// # Errors
    ///
    /// Returns an error if conversion or the write fails.
    pub async fn save_record<R: Record>(&self, record: R) -> Result<Item, StoreError> {
        let item = record.into_item()?;
        self.save_item(&item).await?;
        Ok(item)
    }
}

fn convert_lenient<R: Record>(items: Vec<Item>) -> Vec<R> {
    items
        .into_iter()
        .filter_map(|item| match R::from_item(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping malformed item");
                None
            }
        })
        .collect()
}
