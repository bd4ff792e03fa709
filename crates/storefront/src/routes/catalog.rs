//! Course, workshop and product pages.
//!
//! The three catalog types share handlers; the router injects the type as an
//! `Extension`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::{CatalogEntry, ItemType};

use crate::error::{AppError, Result};
use crate::middleware::{CspNonce, OptionalUser};
use crate::routes::PageChrome;
use crate::state::AppState;

/// Catalog listing template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogIndexTemplate {
    pub chrome: PageChrome,
    pub heading: &'static str,
    pub segment: &'static str,
    pub entries: Vec<CatalogEntry>,
}

/// Catalog detail template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/show.html")]
pub struct CatalogShowTemplate {
    pub chrome: PageChrome,
    pub segment: &'static str,
    pub entry: CatalogEntry,
}

/// Find an entry by slug, falling back to id.
fn find_entry(entries: Vec<CatalogEntry>, key: &str) -> Option<CatalogEntry> {
    entries
        .into_iter()
        .find(|e| e.url_key() == key || e.id.as_str() == key)
}

/// List all entries of the routed catalog type.
#[instrument(skip(state, session, user, nonce))]
pub async fn index(
    State(state): State<AppState>,
    Extension(item_type): Extension<ItemType>,
    session: Session,
    OptionalUser(user): OptionalUser,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let entries = state.store().catalog(item_type).await?;

    Ok(CatalogIndexTemplate {
        chrome: PageChrome::load(&state, &session, user, nonce).await,
        heading: item_type.label(),
        segment: item_type.path_segment().unwrap_or_default(),
        entries,
    })
}

/// Show one entry.
#[instrument(skip(state, session, user, nonce))]
pub async fn show(
    State(state): State<AppState>,
    Extension(item_type): Extension<ItemType>,
    Path(slug): Path<String>,
    session: Session,
    OptionalUser(user): OptionalUser,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let entries = state.store().catalog(item_type).await?;
    let entry = find_entry(entries, &slug)
        .ok_or_else(|| AppError::NotFound(format!("{item_type} {slug}")))?;

    Ok(CatalogShowTemplate {
        chrome: PageChrome::load(&state, &session, user, nonce).await,
        segment: item_type.path_segment().unwrap_or_default(),
        entry,
    })
}
