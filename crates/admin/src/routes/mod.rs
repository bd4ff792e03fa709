//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Health check
//!
//! # Auth (single console password)
//! GET  /login                           - Login page
//! POST /login                           - Verify password (rate limited)
//! POST /logout                          - Logout
//!
//! # Dashboard
//! GET  /                                - Item counts per type, recent orders
//!
//! # Items (generic editor for every type except orders)
//! GET  /items/{type}                    - List items of a type
//! GET  /items/{type}/new                - Empty editor
//! GET  /items/{type}/{id}/edit          - Editor for an existing item
//! POST /items/{type}                    - Create or update
//! POST /items/{type}/{id}/delete        - Delete
//!
//! # Orders
//! GET  /orders                          - Order list (optional ?status=)
//! GET  /orders/{id}                     - Order detail
//! POST /orders/{id}/status              - Move to a later status, email the customer
//!
//! # Newsletter
//! GET  /newsletter                      - Subscribers and compose form
//! POST /newsletter/send                 - Start a broadcast
//!
//! # Media (JSON)
//! POST /media                           - Multipart image upload, returns {key, url}
//! POST /media/delete                    - Delete an object by key
//! ```

use askama::Template;
use axum::{Router, response::Html};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

pub mod auth;
pub mod dashboard;
pub mod items;
pub mod media;
pub mod newsletter;
pub mod orders;

/// Build the admin router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(items::router())
        .merge(orders::router())
        .merge(newsletter::router())
        .merge(media::router())
}

/// Render a template into an HTML response.
fn render(template: &impl Template) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

/// Flash messages carried in the query string after a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}
