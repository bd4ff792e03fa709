//! Customer account page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::Order;

use crate::error::Result;
use crate::middleware::{CspNonce, RequireUser};
use crate::routes::PageChrome;
use crate::state::AppState;

/// Account overview template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub chrome: PageChrome,
    pub name: String,
    pub email: String,
    pub orders: Vec<Order>,
}

/// Display the account overview with the customer's orders, newest first.
#[instrument(skip(state, session, user, nonce), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let mut orders = state
        .store()
        .find_records::<Order>("userId", user.id.as_str())
        .await?;
    orders.retain(|o| o.user_id.as_ref() == Some(&user.id));
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(AccountTemplate {
        name: user.name.clone(),
        email: user.email.to_string(),
        chrome: PageChrome::load(&state, &session, Some(user), nonce).await,
        orders,
    })
}
