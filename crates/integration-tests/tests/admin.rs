//! Admin console flows served in-process against the mock backend.

use std::sync::LazyLock;

use atelier_admin::state::{AppState, StateError};
use atelier_integration_tests::{
    MockBackend, admin_config, client, hash_password, location, spawn_admin,
};
use reqwest::StatusCode;
use serde_json::json;

const PASSWORD: &str = "bisque-fired-cone-06";

// Hashing is slow enough to share across tests
static PASSWORD_HASH: LazyLock<String> = LazyLock::new(|| hash_password(PASSWORD));

async fn signed_in(base: &str) -> reqwest::Client {
    let http = client();
    let response = http
        .post(format!("{base}/login"))
        .form(&[("password", PASSWORD)])
        .send()
        .await
        .expect("login");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    http
}

fn seed_order(mock: &MockBackend, id: &str, status: &str) {
    mock.insert_item(json!({
        "id": id,
        "type": "order",
        "customerName": "Meera Iyer",
        "email": "meera@example.in",
        "lines": [{
            "productId": "w1",
            "itemType": "workshop",
            "title": "Raku evening",
            "unitPrice": "1500",
            "quantity": 2
        }],
        "subtotal": "3000",
        "shippingFee": "0",
        "total": "3000",
        "status": status,
        "createdAt": "2026-10-02T09:30:00Z"
    }));
}

#[tokio::test]
async fn test_pages_require_login() {
    let mock = MockBackend::start().await;
    let base = spawn_admin(&mock, &PASSWORD_HASH).await;
    let http = client();

    let health = http.get(format!("{base}/health")).send().await.expect("health");
    assert_eq!(health.status(), StatusCode::OK);

    let dashboard = http.get(format!("{base}/")).send().await.expect("dashboard");
    assert_eq!(dashboard.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&dashboard), "/login");

    let orders = http.get(format!("{base}/orders")).send().await.expect("orders");
    assert_eq!(location(&orders), "/login");

    let media = http
        .post(format!("{base}/media/delete"))
        .json(&json!({ "key": "media/misc/x.png" }))
        .send()
        .await
        .expect("media");
    assert_eq!(media.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_and_logout() {
    let mock = MockBackend::start().await;
    let base = spawn_admin(&mock, &PASSWORD_HASH).await;
    let http = client();

    let wrong = http
        .post(format!("{base}/login"))
        .form(&[("password", "not-the-password")])
        .send()
        .await
        .expect("login");
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(wrong.text().await.expect("body").contains("Incorrect password."));

    let right = http
        .post(format!("{base}/login"))
        .form(&[("password", PASSWORD)])
        .send()
        .await
        .expect("login");
    assert_eq!(location(&right), "/");

    let dashboard = http.get(format!("{base}/")).send().await.expect("dashboard");
    assert_eq!(dashboard.status(), StatusCode::OK);

    let logout = http.post(format!("{base}/logout")).send().await.expect("logout");
    assert_eq!(location(&logout), "/login?success=logged_out");

    let after = http.get(format!("{base}/")).send().await.expect("dashboard");
    assert_eq!(location(&after), "/login");
}

#[tokio::test]
async fn test_order_status_change_emails_customer() {
    let mock = MockBackend::start().await;
    seed_order(&mock, "ord4f7a2c9e", "paid");
    let base = spawn_admin(&mock, &PASSWORD_HASH).await;
    let http = signed_in(&base).await;

    let listing = http.get(format!("{base}/orders")).send().await.expect("orders");
    assert_eq!(listing.status(), StatusCode::OK);
    assert!(listing.text().await.expect("body").contains("Meera Iyer"));

    let response = http
        .post(format!("{base}/orders/ord4f7a2c9e/status"))
        .form(&[("status", "shipped"), ("tracking_number", "DTDC7781"), ("note", "")])
        .send()
        .await
        .expect("status");
    assert_eq!(location(&response), "/orders/ord4f7a2c9e?success=updated");

    let order = mock.item("ord4f7a2c9e").expect("order");
    assert_eq!(order["status"], "shipped");
    assert_eq!(order["trackingNumber"], "DTDC7781");
    assert!(order.get("note").is_none());

    let mails = mock.mails();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0]["to"], "meera@example.in");
    assert_eq!(mails[0]["subject"], "Atelier: order ORD4F7A2 is shipped");

    let detail = http
        .get(format!("{base}/orders/ord4f7a2c9e?success=updated"))
        .send()
        .await
        .expect("detail");
    assert_eq!(detail.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_order_status_change_survives_mail_failure() {
    let mock = MockBackend::start().await;
    seed_order(&mock, "ord9b1", "paid");
    mock.set_mail_down(true);
    let base = spawn_admin(&mock, &PASSWORD_HASH).await;
    let http = signed_in(&base).await;

    let response = http
        .post(format!("{base}/orders/ord9b1/status"))
        .form(&[("status", "processing")])
        .send()
        .await
        .expect("status");

    assert_eq!(location(&response), "/orders/ord9b1?success=updated_no_email");
    assert_eq!(mock.item("ord9b1").expect("order")["status"], "processing");
}

#[tokio::test]
async fn test_finished_order_cannot_move_back() {
    let mock = MockBackend::start().await;
    seed_order(&mock, "ord77", "delivered");
    let base = spawn_admin(&mock, &PASSWORD_HASH).await;
    let http = signed_in(&base).await;

    let response = http
        .post(format!("{base}/orders/ord77/status"))
        .form(&[("status", "paid")])
        .send()
        .await
        .expect("status");

    assert_eq!(location(&response), "/orders/ord77?error=transition");
    assert_eq!(mock.item("ord77").expect("order")["status"], "delivered");
    assert!(mock.mails().is_empty());

    let unknown = http
        .post(format!("{base}/orders/ord77/status"))
        .form(&[("status", "teleported")])
        .send()
        .await
        .expect("status");
    assert_eq!(location(&unknown), "/orders/ord77?error=status");
}

#[tokio::test]
async fn test_item_editor_creates_and_guards_slugs() {
    let mock = MockBackend::start().await;
    let base = spawn_admin(&mock, &PASSWORD_HASH).await;
    let http = signed_in(&base).await;

    let form = http
        .get(format!("{base}/items/workshop/new"))
        .send()
        .await
        .expect("new form");
    assert_eq!(form.status(), StatusCode::OK);

    let created = http
        .post(format!("{base}/items/workshop"))
        .form(&[
            ("title", "Raku evening"),
            ("slug", "raku-evening"),
            ("price", "1500"),
            ("stock", "8"),
            ("featured", "on"),
        ])
        .send()
        .await
        .expect("create");
    assert_eq!(location(&created), "/items/workshop?success=saved");

    let workshops = mock.items_of_type("workshop");
    assert_eq!(workshops.len(), 1);
    assert_eq!(workshops[0]["slug"], "raku-evening");
    assert_eq!(workshops[0]["price"], "1500");
    assert_eq!(workshops[0]["featured"], true);
    assert!(workshops[0]["createdAt"].is_string());

    let duplicate = http
        .post(format!("{base}/items/workshop"))
        .form(&[("title", "Raku night"), ("slug", "raku-evening"), ("price", "900")])
        .send()
        .await
        .expect("duplicate");
    assert_eq!(duplicate.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(duplicate.text().await.expect("body").contains("already used"));
    assert_eq!(mock.items_of_type("workshop").len(), 1);

    let untitled = http
        .post(format!("{base}/items/workshop"))
        .form(&[("title", " "), ("price", "900")])
        .send()
        .await
        .expect("untitled");
    assert_eq!(untitled.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let orders = http
        .get(format!("{base}/items/order"))
        .send()
        .await
        .expect("orders editor");
    assert_eq!(orders.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_item_editor_updates_cart_quantity() {
    let mock = MockBackend::start().await;
    mock.insert_item(json!({
        "id": "cart-u1-p1",
        "type": "cart",
        "userId": "u1",
        "productId": "p1",
        "itemType": "product",
        "title": "Speckled mug",
        "unitPrice": "650",
        "quantity": 1
    }));
    let base = spawn_admin(&mock, &PASSWORD_HASH).await;
    let http = signed_in(&base).await;

    let response = http
        .post(format!("{base}/items/cart"))
        .form(&[
            ("id", "cart-u1-p1"),
            ("userId", "u1"),
            ("productId", "p1"),
            ("quantity", "3"),
        ])
        .send()
        .await
        .expect("save cart line");
    assert_eq!(location(&response), "/items/cart?success=saved");

    let line = mock.item("cart-u1-p1").expect("cart line");
    assert_eq!(line["quantity"], "3");
    assert_eq!(line["title"], "Speckled mug");
}

#[tokio::test]
async fn test_newsletter_broadcast_reaches_active_subscribers() {
    let mock = MockBackend::start().await;
    mock.insert_item(json!({"id": "n1", "type": "newsletter", "email": "meera@example.in", "active": true}));
    mock.insert_item(json!({"id": "n2", "type": "newsletter", "email": "arjun@example.in", "active": false}));
    let base = spawn_admin(&mock, &PASSWORD_HASH).await;
    let http = signed_in(&base).await;

    let empty = http
        .post(format!("{base}/newsletter/send"))
        .form(&[("subject", "Spring kiln opening"), ("body", "")])
        .send()
        .await
        .expect("send");
    assert_eq!(empty.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let started = http
        .post(format!("{base}/newsletter/send"))
        .form(&[
            ("subject", "Spring kiln opening"),
            ("body", "The kiln opens on Saturday.\n\nBring a friend."),
        ])
        .send()
        .await
        .expect("send");
    assert_eq!(location(&started), "/newsletter?success=started&count=1");

    let mails = mock.wait_for_mails(1).await;
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0]["to"], "meera@example.in");
    assert_eq!(mails[0]["subject"], "Spring kiln opening");

    let page = http
        .get(format!("{base}/newsletter?success=started&count=1"))
        .send()
        .await
        .expect("newsletter page");
    assert!(page.text().await.expect("body").contains("Sending to 1 subscriber."));
}

#[tokio::test]
async fn test_storage_credentials_from_secrets() {
    let mock = MockBackend::start().await;
    let mut config = admin_config(&mock, &PASSWORD_HASH);
    config.storage.credentials = None;

    let Err(error) = AppState::new(config.clone()).await else {
        panic!("state built without storage credentials");
    };
    assert!(matches!(error, StateError::MissingSecret("s3_access_key_id")));

    mock.set_secret("s3_access_key_id", "AKIDSTUDIO");
    mock.set_secret("s3_secret_access_key", "studio-secret");
    assert!(AppState::new(config).await.is_ok());
}
