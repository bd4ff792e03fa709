//! Page chrome shared by every storefront template.

use chrono::{Datelike, Utc};
use serde::Deserialize;
use tower_sessions::Session;

use atelier_core::AccountConfig;

use crate::models::CurrentUser;
use crate::services::CartService;
use crate::state::AppState;

/// Header and footer data rendered by `base.html`.
#[derive(Debug, Clone)]
pub struct PageChrome {
    pub studio_name: String,
    pub nonce: String,
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub contact_email: Option<String>,
    pub instagram: Option<String>,
    pub year: i32,
}

impl PageChrome {
    /// Gather the chrome for one request. Store failures degrade to an
    /// empty badge rather than failing the page.
    pub async fn load(
        state: &AppState,
        session: &Session,
        user: Option<CurrentUser>,
        nonce: String,
    ) -> Self {
        let cart_count = match CartService::new(state.store(), session, user.as_ref())
            .load()
            .await
        {
            Ok(cart) => cart.item_count(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not load cart for page header");
                0
            }
        };
        let settings = match state.account_config().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load account config for page header");
                AccountConfig::default()
            }
        };

        Self {
            studio_name: settings
                .studio_name
                .unwrap_or_else(|| state.config().studio.name.clone()),
            nonce,
            user,
            cart_count,
            contact_email: settings.contact_email,
            instagram: settings.instagram,
            year: Utc::now().year(),
        }
    }
}

/// Query parameters for error/success banners.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}
