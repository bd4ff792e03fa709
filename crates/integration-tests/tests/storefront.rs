//! Storefront flows served in-process against the mock backend.

use atelier_integration_tests::{
    MockBackend, RAZORPAY_KEY_SECRET, client, location, spawn_storefront, spawn_storefront_with,
    storefront_config,
};
use atelier_storefront::services::razorpay::payment_signature;
use reqwest::StatusCode;
use serde_json::{Value, json};

fn seed_catalog(mock: &MockBackend) {
    mock.insert_item(json!({
        "id": "w1",
        "type": "workshop",
        "slug": "raku-evening",
        "title": "Raku evening",
        "price": "1500",
        "stock": "3",
        "date": "2026-11-14"
    }));
    mock.insert_item(json!({
        "id": "p1",
        "type": "product",
        "slug": "speckled-mug",
        "title": "Speckled mug",
        "price": "650",
        "stock": "10"
    }));
}

async fn add_to_cart(http: &reqwest::Client, base: &str, product_id: &str, quantity: u32) -> String {
    let response = http
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", product_id), ("quantity", &quantity.to_string())])
        .send()
        .await
        .expect("add to cart");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    location(&response)
}

async fn cart_count(http: &reqwest::Client, base: &str) -> String {
    http.get(format!("{base}/cart/count"))
        .send()
        .await
        .expect("cart count")
        .text()
        .await
        .expect("count body")
}

/// Register an account, leaving `http` logged in, and return its user id.
async fn register(mock: &MockBackend, http: &reqwest::Client, base: &str) -> String {
    let response = http
        .post(format!("{base}/auth/register"))
        .form(&[
            ("name", "Meera Iyer"),
            ("email", "meera@example.in"),
            ("password", "slip-and-score-42"),
            ("password_confirm", "slip-and-score-42"),
        ])
        .send()
        .await
        .expect("register");
    assert_eq!(location(&response), "/account");

    let users = mock.items_of_type("user");
    assert_eq!(users.len(), 1);
    users[0]["id"].as_str().expect("user id").to_string()
}

#[tokio::test]
async fn test_health() {
    let mock = MockBackend::start().await;
    let base = spawn_storefront(&mock).await;

    let response = client()
        .get(format!("{base}/health"))
        .send()
        .await
        .expect("health");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_catalog_pages() {
    let mock = MockBackend::start().await;
    seed_catalog(&mock);
    let base = spawn_storefront(&mock).await;
    let http = client();

    let listing = http
        .get(format!("{base}/workshops"))
        .send()
        .await
        .expect("listing");
    assert_eq!(listing.status(), StatusCode::OK);
    assert!(listing.text().await.expect("body").contains("Raku evening"));

    let detail = http
        .get(format!("{base}/workshops/raku-evening"))
        .send()
        .await
        .expect("detail");
    assert_eq!(detail.status(), StatusCode::OK);

    let missing = http
        .get(format!("{base}/workshops/no-such-workshop"))
        .send()
        .await
        .expect("missing");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_guest_cart() {
    let mock = MockBackend::start().await;
    seed_catalog(&mock);
    let base = spawn_storefront(&mock).await;
    let http = client();

    assert_eq!(cart_count(&http, &base).await, "0");

    assert_eq!(add_to_cart(&http, &base, "p1", 2).await, "/cart");
    assert_eq!(add_to_cart(&http, &base, "w1", 1).await, "/cart");
    assert_eq!(cart_count(&http, &base).await, "3");

    let page = http
        .get(format!("{base}/cart"))
        .send()
        .await
        .expect("cart page")
        .text()
        .await
        .expect("cart body");
    assert!(page.contains("Speckled mug"));
    assert!(page.contains("Raku evening"));

    let removed = http
        .post(format!("{base}/cart/remove"))
        .form(&[("product_id", "p1")])
        .send()
        .await
        .expect("remove");
    assert_eq!(location(&removed), "/cart");
    assert_eq!(cart_count(&http, &base).await, "1");

    // Guest carts never touch the store
    assert!(mock.items_of_type("cart").is_empty());
}

#[tokio::test]
async fn test_cart_refuses_more_than_stock() {
    let mock = MockBackend::start().await;
    seed_catalog(&mock);
    let base = spawn_storefront(&mock).await;
    let http = client();

    assert_eq!(add_to_cart(&http, &base, "w1", 2).await, "/cart");
    assert_eq!(add_to_cart(&http, &base, "w1", 2).await, "/cart?error=stock");
    assert_eq!(add_to_cart(&http, &base, "gone", 1).await, "/cart?error=unavailable");
    assert_eq!(cart_count(&http, &base).await, "2");
}

#[tokio::test]
async fn test_register_merges_guest_cart() {
    let mock = MockBackend::start().await;
    seed_catalog(&mock);
    let base = spawn_storefront(&mock).await;
    let http = client();

    add_to_cart(&http, &base, "p1", 2).await;

    let response = http
        .post(format!("{base}/auth/register"))
        .form(&[
            ("name", "Meera Iyer"),
            ("email", "Meera@Example.in"),
            ("password", "slip-and-score-42"),
            ("password_confirm", "slip-and-score-42"),
        ])
        .send()
        .await
        .expect("register");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/account");

    let users = mock.items_of_type("user");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "meera@example.in");
    assert!(users[0]["passwordHash"].as_str().is_some_and(|h| h.starts_with("$argon2")));

    let lines = mock.items_of_type("cart");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["productId"], "p1");
    assert_eq!(lines[0]["userId"], users[0]["id"]);
    assert_eq!(lines[0]["quantity"], 2);

    // The server cart is what the badge reads now
    assert_eq!(cart_count(&http, &base).await, "2");

    let account = http
        .get(format!("{base}/account"))
        .send()
        .await
        .expect("account");
    assert_eq!(account.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_claims_checkout_account() {
    let mock = MockBackend::start().await;
    mock.insert_item(json!({
        "id": "u-guest",
        "type": "user",
        "name": "Meera",
        "email": "meera@example.in",
        "phone": "+91 98200 11223",
        "createdAt": "2026-09-12T08:00:00Z",
        "address": {"line1": "14 Potters Lane", "city": "Pune"},
        "source": "checkout"
    }));
    let base = spawn_storefront(&mock).await;
    let http = client();

    let user_id = register(&mock, &http, &base).await;
    assert_eq!(user_id, "u-guest");

    let user = mock.item("u-guest").expect("user");
    assert_eq!(user["name"], "Meera Iyer");
    assert!(user["passwordHash"].is_string());
    assert_eq!(user["phone"], "+91 98200 11223");
    assert_eq!(user["address"]["city"], "Pune");
    assert_eq!(user["source"], "checkout");
}

#[tokio::test]
async fn test_register_rejects_mismatched_passwords() {
    let mock = MockBackend::start().await;
    let base = spawn_storefront(&mock).await;

    let response = client()
        .post(format!("{base}/auth/register"))
        .form(&[
            ("name", "Meera Iyer"),
            ("email", "meera@example.in"),
            ("password", "slip-and-score-42"),
            ("password_confirm", "slip-and-score-43"),
        ])
        .send()
        .await
        .expect("register");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(mock.items_of_type("user").is_empty());
}

#[tokio::test]
async fn test_newsletter_signup_is_idempotent() {
    let mock = MockBackend::start().await;
    let base = spawn_storefront(&mock).await;
    let http = client();

    for _ in 0..2 {
        let response = http
            .post(format!("{base}/newsletter"))
            .form(&[("email", "arjun@example.in")])
            .send()
            .await
            .expect("subscribe");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let subscribers = mock.items_of_type("newsletter");
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0]["email"], "arjun@example.in");

    let invalid = http
        .post(format!("{base}/newsletter"))
        .form(&[("email", "not-an-email")])
        .send()
        .await
        .expect("subscribe");
    assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_newsletter_reactivation_keeps_fields() {
    let mock = MockBackend::start().await;
    mock.insert_item(json!({
        "id": "n1",
        "type": "newsletter",
        "email": "arjun@example.in",
        "active": false,
        "source": "pottery-fair"
    }));
    let base = spawn_storefront(&mock).await;

    let response = client()
        .post(format!("{base}/newsletter"))
        .form(&[("email", "arjun@example.in")])
        .send()
        .await
        .expect("subscribe");
    assert_eq!(response.status(), StatusCode::OK);

    let subscriber = mock.item("n1").expect("subscriber");
    assert_eq!(subscriber["active"], true);
    assert_eq!(subscriber["source"], "pottery-fair");
    assert_eq!(mock.items_of_type("newsletter").len(), 1);
}

/// Stage a checkout for two seats of `w1` and create the gateway order.
async fn stage_workshop_payment(http: &reqwest::Client, base: &str) -> String {
    add_to_cart(http, base, "w1", 2).await;

    let staged = http
        .post(format!("{base}/checkout"))
        .form(&[("name", "Meera Iyer"), ("email", "meera@example.in")])
        .send()
        .await
        .expect("checkout");
    assert_eq!(staged.status(), StatusCode::SEE_OTHER);
    let payment_url = location(&staged);
    assert!(payment_url.starts_with("/payment?token="));

    let page = http
        .get(format!("{base}{payment_url}"))
        .send()
        .await
        .expect("payment page");
    assert_eq!(page.status(), StatusCode::OK);

    let created: Value = http
        .post(format!("{base}/api/razorpay/order"))
        .json(&json!({ "amount": "3000" }))
        .send()
        .await
        .expect("gateway order")
        .json()
        .await
        .expect("gateway order body");
    assert_eq!(created["keyId"], "rzp_test_key");
    created["orderId"]
        .as_str()
        .expect("gateway order id")
        .to_string()
}

#[tokio::test]
async fn test_checkout_and_payment() {
    let mock = MockBackend::start().await;
    seed_catalog(&mock);
    let base = spawn_storefront(&mock).await;
    let http = client();

    let gateway_order_id = stage_workshop_payment(&http, &base).await;
    let signature = payment_signature(RAZORPAY_KEY_SECRET, &gateway_order_id, "pay_MOCK1")
        .expect("signature");

    let confirmed = http
        .post(format!("{base}/payment/confirm"))
        .form(&[
            ("razorpay_order_id", gateway_order_id.as_str()),
            ("razorpay_payment_id", "pay_MOCK1"),
            ("razorpay_signature", signature.as_str()),
        ])
        .send()
        .await
        .expect("confirm");
    assert_eq!(confirmed.status(), StatusCode::SEE_OTHER);
    let thank_you = location(&confirmed);
    let order_id = thank_you
        .strip_prefix("/orders/")
        .and_then(|rest| rest.strip_suffix("/thank-you"))
        .expect("thank-you redirect")
        .to_string();

    let order = mock.item(&order_id).expect("order saved");
    assert_eq!(order["type"], "order");
    assert_eq!(order["status"], "paid");
    assert_eq!(order["razorpayOrderId"], gateway_order_id.as_str());
    assert_eq!(order["razorpayPaymentId"], "pay_MOCK1");
    assert_eq!(order["email"], "meera@example.in");

    let workshop = mock.item("w1").expect("workshop");
    assert_eq!(workshop["stock"], "1");

    let customers = mock.items_of_type("user");
    assert_eq!(customers.len(), 1);
    assert_eq!(order["userId"], customers[0]["id"]);

    let mails = mock.wait_for_mails(1).await;
    assert!(mails.iter().any(|m| m["to"] == "meera@example.in"
        && m["subject"].as_str().is_some_and(|s| s.contains("confirmed"))));

    assert_eq!(cart_count(&http, &base).await, "0");
    let page = http
        .get(format!("{base}{thank_you}"))
        .send()
        .await
        .expect("thank-you page");
    assert_eq!(page.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forged_signature_is_rejected() {
    let mock = MockBackend::start().await;
    seed_catalog(&mock);
    let base = spawn_storefront(&mock).await;
    let http = client();

    let gateway_order_id = stage_workshop_payment(&http, &base).await;
    let forged = payment_signature("not-the-key-secret", &gateway_order_id, "pay_MOCK1")
        .expect("signature");

    let response = http
        .post(format!("{base}/payment/confirm"))
        .form(&[
            ("razorpay_order_id", gateway_order_id.as_str()),
            ("razorpay_payment_id", "pay_MOCK1"),
            ("razorpay_signature", forged.as_str()),
        ])
        .send()
        .await
        .expect("confirm");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(mock.items_of_type("order").is_empty());
    assert_eq!(mock.item("w1").expect("workshop")["stock"], "3");
    assert_eq!(cart_count(&http, &base).await, "2");
}

#[tokio::test]
async fn test_gateway_amount_must_match_cart() {
    let mock = MockBackend::start().await;
    seed_catalog(&mock);
    let base = spawn_storefront(&mock).await;
    let http = client();

    add_to_cart(&http, &base, "w1", 1).await;
    http.post(format!("{base}/checkout"))
        .form(&[("name", "Meera Iyer"), ("email", "meera@example.in")])
        .send()
        .await
        .expect("checkout");

    let response = http
        .post(format!("{base}/api/razorpay/order"))
        .json(&json!({ "amount": "1" }))
        .send()
        .await
        .expect("gateway order");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_needs_address_for_products() {
    let mock = MockBackend::start().await;
    seed_catalog(&mock);
    let base = spawn_storefront(&mock).await;
    let http = client();

    add_to_cart(&http, &base, "p1", 1).await;
    let response = http
        .post(format!("{base}/checkout"))
        .form(&[("name", "Meera Iyer"), ("email", "meera@example.in")])
        .send()
        .await
        .expect("checkout");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

async fn confirm_payment(
    http: &reqwest::Client,
    base: &str,
    gateway_order_id: &str,
) -> reqwest::Response {
    let signature =
        payment_signature(RAZORPAY_KEY_SECRET, gateway_order_id, "pay_MOCK1").expect("signature");
    http.post(format!("{base}/payment/confirm"))
        .form(&[
            ("razorpay_order_id", gateway_order_id),
            ("razorpay_payment_id", "pay_MOCK1"),
            ("razorpay_signature", signature.as_str()),
        ])
        .send()
        .await
        .expect("confirm")
}

#[tokio::test]
async fn test_logged_in_checkout_clears_server_cart() {
    let mock = MockBackend::start().await;
    seed_catalog(&mock);
    let base = spawn_storefront(&mock).await;
    let http = client();
    let user_id = register(&mock, &http, &base).await;

    let gateway_order_id = stage_workshop_payment(&http, &base).await;
    let lines = mock.items_of_type("cart");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["id"], format!("cart-{user_id}-w1"));

    let confirmed = confirm_payment(&http, &base, &gateway_order_id).await;
    assert_eq!(confirmed.status(), StatusCode::SEE_OTHER);

    assert!(mock.items_of_type("cart").is_empty());
    let orders = mock.items_of_type("order");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["userId"], user_id.as_str());
    assert_eq!(mock.items_of_type("user").len(), 1);
    assert_eq!(cart_count(&http, &base).await, "0");
}

#[tokio::test]
async fn test_studio_is_alerted_of_new_orders() {
    let mock = MockBackend::start().await;
    seed_catalog(&mock);
    let mut config = storefront_config(&mock);
    config.studio.notify_email = Some("kiln@atelier.test".to_string());
    let base = spawn_storefront_with(config).await;
    let http = client();

    let gateway_order_id = stage_workshop_payment(&http, &base).await;
    let confirmed = confirm_payment(&http, &base, &gateway_order_id).await;
    assert_eq!(confirmed.status(), StatusCode::SEE_OTHER);

    let mails = mock.wait_for_mails(2).await;
    assert_eq!(mails.len(), 2);
    let alert = mails
        .iter()
        .find(|m| m["to"] == "kiln@atelier.test")
        .expect("studio alert");
    let subject = alert["subject"].as_str().expect("subject");
    assert!(subject.starts_with("New order "));
    assert!(subject.contains("Meera Iyer"));
    assert!(mails.iter().any(|m| m["to"] == "meera@example.in"));
}

#[tokio::test]
async fn test_payment_page_rejects_foreign_links() {
    let mock = MockBackend::start().await;
    seed_catalog(&mock);
    let base = spawn_storefront(&mock).await;
    let http = client();

    add_to_cart(&http, &base, "w1", 1).await;
    let first = http
        .post(format!("{base}/checkout"))
        .form(&[("name", "Meera Iyer"), ("email", "meera@example.in")])
        .send()
        .await
        .expect("checkout");
    let first_url = location(&first);

    let tampered = http
        .get(format!("{base}{first_url}x"))
        .send()
        .await
        .expect("tampered link");
    assert_eq!(tampered.status(), StatusCode::BAD_REQUEST);

    // Restaging replaces the order the first link was signed for
    add_to_cart(&http, &base, "w1", 1).await;
    let second = http
        .post(format!("{base}/checkout"))
        .form(&[("name", "Meera Iyer"), ("email", "meera@example.in")])
        .send()
        .await
        .expect("checkout");
    let second_url = location(&second);
    assert_ne!(first_url, second_url);

    let stale = http
        .get(format!("{base}{first_url}"))
        .send()
        .await
        .expect("stale link");
    assert_eq!(stale.status(), StatusCode::BAD_REQUEST);

    let current = http
        .get(format!("{base}{second_url}"))
        .send()
        .await
        .expect("current link");
    assert_eq!(current.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logged_in_zero_quantity_deletes_line() {
    let mock = MockBackend::start().await;
    seed_catalog(&mock);
    let base = spawn_storefront(&mock).await;
    let http = client();
    let user_id = register(&mock, &http, &base).await;

    assert_eq!(add_to_cart(&http, &base, "p1", 2).await, "/cart");
    let line_id = format!("cart-{user_id}-p1");
    assert_eq!(mock.item(&line_id).expect("cart line")["quantity"], 2);

    let response = http
        .post(format!("{base}/cart/update"))
        .form(&[("product_id", "p1"), ("quantity", "0")])
        .send()
        .await
        .expect("update");
    assert_eq!(location(&response), "/cart");

    assert!(mock.item(&line_id).is_none());
    assert_eq!(cart_count(&http, &base).await, "0");
}

#[tokio::test]
async fn test_checkout_fails_without_studio_settings() {
    let mock = MockBackend::start().await;
    seed_catalog(&mock);
    mock.fail_listing("accountconfig");
    let base = spawn_storefront(&mock).await;
    let http = client();

    add_to_cart(&http, &base, "p1", 1).await;
    let response = http
        .post(format!("{base}/checkout"))
        .form(&[
            ("name", "Meera Iyer"),
            ("email", "meera@example.in"),
            ("line1", "14 Potters Lane"),
            ("city", "Pune"),
            ("state", "Maharashtra"),
            ("postal_code", "411001"),
        ])
        .send()
        .await
        .expect("checkout");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(location(&response).is_empty());

    let gateway = http
        .post(format!("{base}/api/razorpay/order"))
        .json(&json!({ "amount": "650" }))
        .send()
        .await
        .expect("gateway order");
    assert_eq!(gateway.status(), StatusCode::BAD_REQUEST);
}
