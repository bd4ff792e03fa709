//! Integration test support for Atelier.
//!
//! [`MockBackend`] serves the item store REST API, the mail endpoint and the
//! Razorpay orders endpoint from memory on an ephemeral port. The storefront
//! and admin apps are served in-process against it, so the tests need no
//! external services.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p atelier-integration-tests
//! ```

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use secrecy::SecretString;
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;

use atelier_core::mail::MailConfig;
use atelier_core::store::ItemStoreConfig;

/// Razorpay key secret the storefront is configured with.
pub const RAZORPAY_KEY_SECRET: &str = "rzp_test_Vb7Lq2Xn9Kd4Tm1Wz";

/// Sender address for every outgoing mail.
pub const MAIL_FROM: &str = "studio@atelier.test";

#[derive(Default)]
struct MockData {
    items: Vec<Value>,
    mails: Vec<Value>,
    secrets: HashMap<String, String>,
    gateway_orders: usize,
    mail_down: bool,
    failing_listings: Vec<String>,
}

type Shared = Arc<Mutex<MockData>>;

fn lock(data: &Shared) -> MutexGuard<'_, MockData> {
    data.lock().expect("mock state poisoned")
}

/// In-memory item store, mail endpoint and payment gateway.
#[derive(Clone)]
pub struct MockBackend {
    base_url: String,
    data: Shared,
}

impl MockBackend {
    /// Start the mock on `127.0.0.1` with an ephemeral port.
    pub async fn start() -> Self {
        let data = Shared::default();
        let router = Router::new()
            .route("/store/itemsbytype/{item_type}", get(items_by_type))
            .route("/store/items", post(save_item))
            .route("/store/items/id/{id}", get(item_by_id))
            .route("/store/items/filter2column", post(filter_items))
            .route("/store/items/{slug}", get(item_by_slug))
            .route("/store/removeitem/{id}", delete(remove_item))
            .route("/store/getsecrets", post(get_secrets))
            .route("/mail/send", post(send_mail))
            .route("/razorpay/v1/orders", post(create_gateway_order))
            .with_state(data.clone());

        let addr = serve(router).await;
        Self {
            base_url: format!("http://{addr}"),
            data,
        }
    }

    /// Item store base URL.
    #[must_use]
    pub fn store_url(&self) -> String {
        format!("{}/store", self.base_url)
    }

    /// Mail endpoint URL.
    #[must_use]
    pub fn mail_url(&self) -> String {
        format!("{}/mail/send", self.base_url)
    }

    /// Razorpay API base.
    #[must_use]
    pub fn razorpay_url(&self) -> String {
        format!("{}/razorpay", self.base_url)
    }

    /// Object storage endpoint. Nothing answers there.
    #[must_use]
    pub fn storage_url(&self) -> String {
        format!("{}/s3", self.base_url)
    }

    /// Insert or replace an item by id.
    pub fn insert_item(&self, item: Value) {
        upsert(&mut lock(&self.data).items, item);
    }

    /// Current state of an item.
    #[must_use]
    pub fn item(&self, id: &str) -> Option<Value> {
        lock(&self.data)
            .items
            .iter()
            .find(|i| i["id"] == id)
            .cloned()
    }

    /// Every stored item of one type.
    #[must_use]
    pub fn items_of_type(&self, item_type: &str) -> Vec<Value> {
        lock(&self.data)
            .items
            .iter()
            .filter(|i| i["type"] == item_type)
            .cloned()
            .collect()
    }

    /// Mails received so far.
    #[must_use]
    pub fn mails(&self) -> Vec<Value> {
        lock(&self.data).mails.clone()
    }

    /// Wait up to five seconds for at least `count` mails.
    pub async fn wait_for_mails(&self, count: usize) -> Vec<Value> {
        for _ in 0..100 {
            let mails = self.mails();
            if mails.len() >= count {
                return mails;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.mails()
    }

    /// Make a secret available through `getsecrets`.
    pub fn set_secret(&self, key: &str, value: &str) {
        lock(&self.data)
            .secrets
            .insert(key.to_string(), value.to_string());
    }

    /// Make the mail endpoint answer 500.
    pub fn set_mail_down(&self, down: bool) {
        lock(&self.data).mail_down = down;
    }

    /// Make `itemsbytype/{item_type}` answer 500.
    pub fn fail_listing(&self, item_type: &str) {
        lock(&self.data).failing_listings.push(item_type.to_string());
    }
}

fn upsert(items: &mut Vec<Value>, item: Value) {
    let id = item["id"].clone();
    match items.iter_mut().find(|i| i["id"] == id) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

/// Field as text, the way the store compares filter values.
fn field_text(item: &Value, column: &str) -> Option<String> {
    match item.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

async fn items_by_type(State(data): State<Shared>, Path(item_type): Path<String>) -> Response {
    let data = lock(&data);
    if data.failing_listings.contains(&item_type) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "listing unavailable").into_response();
    }
    let items: Vec<Value> = data
        .items
        .iter()
        .filter(|i| i["type"] == item_type.as_str())
        .cloned()
        .collect();
    Json(items).into_response()
}

async fn save_item(State(data): State<Shared>, Json(item): Json<Value>) -> Response {
    if !item["id"].is_string() || !item["type"].is_string() {
        return (StatusCode::BAD_REQUEST, "id and type are required").into_response();
    }
    upsert(&mut lock(&data).items, item.clone());
    Json(item).into_response()
}

async fn item_by_id(State(data): State<Shared>, Path(id): Path<String>) -> Response {
    let data = lock(&data);
    match data.items.iter().find(|i| i["id"] == id.as_str()) {
        Some(item) => Json(item.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn item_by_slug(State(data): State<Shared>, Path(slug): Path<String>) -> Response {
    let data = lock(&data);
    match data.items.iter().find(|i| i["slug"] == slug.as_str()) {
        Some(item) => Json(item.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn filter_items(State(data): State<Shared>, Json(filter): Json<Value>) -> Response {
    let Some(item_type) = filter["type"].as_str() else {
        return (StatusCode::BAD_REQUEST, "type is required").into_response();
    };
    let pairs = [
        (filter["column1"].as_str(), filter["value1"].as_str()),
        (filter["column2"].as_str(), filter["value2"].as_str()),
    ];
    let data = lock(&data);
    let matches: Vec<Value> = data
        .items
        .iter()
        .filter(|item| item["type"] == item_type)
        .filter(|item| {
            pairs.iter().all(|(column, value)| match (column, value) {
                (Some(column), Some(value)) => field_text(item, column).as_deref() == Some(*value),
                _ => false,
            })
        })
        .cloned()
        .collect();
    Json(matches).into_response()
}

async fn remove_item(State(data): State<Shared>, Path(id): Path<String>) -> StatusCode {
    lock(&data).items.retain(|i| i["id"] != id.as_str());
    StatusCode::OK
}

async fn get_secrets(State(data): State<Shared>, Json(request): Json<Value>) -> Json<Value> {
    let data = lock(&data);
    let mut found = Map::new();
    for key in request["keys"].as_array().into_iter().flatten() {
        if let Some(value) = key.as_str().and_then(|k| data.secrets.get(k)) {
            found.insert(key.as_str().unwrap_or_default().to_string(), json!(value));
        }
    }
    Json(Value::Object(found))
}

async fn send_mail(State(data): State<Shared>, Json(mail): Json<Value>) -> Response {
    let mut data = lock(&data);
    if data.mail_down {
        return (StatusCode::INTERNAL_SERVER_ERROR, "mail relay unavailable").into_response();
    }
    data.mails.push(mail);
    Json(json!({ "queued": true })).into_response()
}

async fn create_gateway_order(State(data): State<Shared>, Json(request): Json<Value>) -> Json<Value> {
    let mut data = lock(&data);
    data.gateway_orders += 1;
    Json(json!({
        "id": format!("order_MOCK{}", data.gateway_orders),
        "amount": request["amount"],
        "currency": request["currency"],
        "receipt": request["receipt"],
        "status": "created",
    }))
}

/// Serve a router on an ephemeral port with peer addresses available to
/// rate limiters.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .ok();
    });
    addr
}

/// HTTP client that keeps cookies and does not follow redirects.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("build HTTP client")
}

/// `Location` header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Argon2 hash of a password, as `ADMIN_PASSWORD_HASH` holds it.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("hash password")
        .to_string()
}

fn store_config(mock: &MockBackend) -> ItemStoreConfig {
    // Lists are read straight after the mock changes
    ItemStoreConfig {
        cache_ttl: Duration::from_millis(1),
        ..ItemStoreConfig::new(mock.store_url(), None)
    }
}

fn mail_config(mock: &MockBackend) -> MailConfig {
    MailConfig {
        endpoint: mock.mail_url(),
        api_key: None,
        from: MAIL_FROM.to_string(),
    }
}

const LOCALHOST: IpAddr = IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);

/// Storefront settings pointing at the mock.
#[must_use]
pub fn storefront_config(mock: &MockBackend) -> atelier_storefront::config::StorefrontConfig {
    use atelier_storefront::config::{RazorpayConfig, StorefrontConfig, StudioConfig};

    StorefrontConfig {
        host: LOCALHOST,
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        session_secret: SecretString::from("k8Vq2Lr7Zt4Xw9Nc3Pb6Hy1Md5Fs0Gj8Qe2Ua7Tn4Wo9Rx"),
        item_store: store_config(mock),
        razorpay: RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: SecretString::from(RAZORPAY_KEY_SECRET),
            api_base: mock.razorpay_url(),
        },
        mail: mail_config(mock),
        studio: StudioConfig {
            name: "Atelier".to_string(),
            notify_email: None,
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Serve the storefront against the mock and return its base URL.
pub async fn spawn_storefront(mock: &MockBackend) -> String {
    spawn_storefront_with(storefront_config(mock)).await
}

/// Serve the storefront with adjusted settings and return its base URL.
pub async fn spawn_storefront_with(config: atelier_storefront::config::StorefrontConfig) -> String {
    let state = atelier_storefront::state::AppState::new(config).expect("storefront state");
    let addr = serve(atelier_storefront::app(state)).await;
    format!("http://{addr}")
}

/// Admin settings pointing at the mock, with storage credentials set.
#[must_use]
pub fn admin_config(mock: &MockBackend, password_hash: &str) -> atelier_admin::config::AdminConfig {
    use atelier_admin::config::{AdminConfig, StorageConfig, StorageCredentials};

    AdminConfig {
        host: LOCALHOST,
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        password_hash: SecretString::from(password_hash),
        item_store: store_config(mock),
        mail: mail_config(mock),
        studio_name: "Atelier".to_string(),
        newsletter_delay: Duration::from_millis(10),
        storage: StorageConfig {
            endpoint: mock.storage_url(),
            region: "auto".to_string(),
            bucket: "atelier-media".to_string(),
            prefix: Some("media".to_string()),
            public_url: "https://media.atelier.test".to_string(),
            credentials: Some(StorageCredentials {
                access_key_id: "AKIDMOCK".to_string(),
                secret_access_key: SecretString::from("mock-secret-access-key"),
            }),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Serve the admin console against the mock and return its base URL.
pub async fn spawn_admin(mock: &MockBackend, password_hash: &str) -> String {
    let state = atelier_admin::state::AppState::new(admin_config(mock, password_hash))
        .await
        .expect("admin state");
    let addr = serve(atelier_admin::app(state)).await;
    format!("http://{addr}")
}
