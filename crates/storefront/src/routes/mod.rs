//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Home page (slides, featured entries, recent posts)
//!
//! # Catalog
//! GET  /courses                  - Course listing
//! GET  /courses/{slug}           - Course detail
//! GET  /workshops                - Workshop listing
//! GET  /workshops/{slug}         - Workshop detail
//! GET  /products                 - Product listing
//! GET  /products/{slug}          - Product detail
//!
//! # Blog
//! GET  /blog                     - Published posts
//! GET  /blog/{slug}              - Post
//!
//! # Cart
//! GET  /cart                     - Cart page
//! POST /cart/add                 - Add a catalog entry (redirects to /cart)
//! POST /cart/update              - Set a line's quantity (redirects to /cart)
//! POST /cart/remove              - Remove a line (redirects to /cart)
//! GET  /cart/count               - Item count (text)
//!
//! # Checkout and payment (rate limited)
//! GET  /checkout                 - Checkout form
//! POST /checkout                 - Stage the order, redirect to /payment?token=...
//! GET  /payment?token=...        - Payment page
//! POST /api/razorpay/order       - Create the gateway order for the staged amount
//! POST /payment/confirm          - Gateway success callback
//! GET  /orders/{id}/thank-you    - Order confirmation
//!
//! # Auth (rate limited)
//! GET  /auth/login               - Login page
//! POST /auth/login               - Login action
//! GET  /auth/register            - Register page
//! POST /auth/register            - Register action
//! POST /auth/logout              - Logout action
//!
//! # Account (requires auth)
//! GET  /account                  - Account overview with orders
//!
//! # Newsletter
//! POST /newsletter               - Subscribe (idempotent per email)
//! ```

pub mod account;
pub mod auth;
pub mod blog;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod home;
pub mod newsletter;
pub mod orders;
pub mod page;

use axum::{
    Extension, Router,
    routing::{get, post},
};

use atelier_core::ItemType;

use crate::middleware::{auth_rate_limiter, payment_rate_limiter};
use crate::state::AppState;

pub use page::{MessageQuery, PageChrome};

/// Create the routes for one catalog type.
pub fn catalog_routes(item_type: ItemType) -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .route("/{slug}", get(catalog::show))
        .layer(Extension(item_type))
}

/// Create the blog routes router.
pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(blog::index))
        .route("/{slug}", get(blog::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout and payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", get(checkout::form).post(checkout::submit))
        .route("/payment", get(checkout::payment_page))
        .route("/payment/confirm", post(checkout::confirm))
        .route("/api/razorpay/order", post(checkout::create_gateway_order))
        .route_layer(payment_rate_limiter())
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route_layer(auth_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let mut router = Router::new().route("/", get(home::home));
    for item_type in ItemType::CATALOG {
        if let Some(segment) = item_type.path_segment() {
            router = router.nest(&format!("/{segment}"), catalog_routes(item_type));
        }
    }

    router
        .nest("/blog", blog_routes())
        .nest("/cart", cart_routes())
        .merge(payment_routes())
        .route("/orders/{id}/thank-you", get(orders::thank_you))
        .nest("/auth", auth_routes())
        .route("/account", get(account::index))
        .route("/newsletter", post(newsletter::subscribe))
}
