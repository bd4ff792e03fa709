//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::{BlogPost, CatalogEntry, ItemType, Slide};

use crate::error::Result;
use crate::middleware::{CspNonce, OptionalUser};
use crate::routes::PageChrome;
use crate::state::AppState;

/// Featured entries shown per catalog type.
const FEATURED_PER_TYPE: usize = 4;

/// Recent blog posts on the home page.
const RECENT_POSTS: usize = 3;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub chrome: PageChrome,
    pub slides: Vec<Slide>,
    pub featured: Vec<CatalogEntry>,
    pub posts: Vec<BlogPost>,
}

/// Display the home page.
#[instrument(skip(state, session, user, nonce))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let store = state.store();

    let mut slides = store.records::<Slide>().await?;
    slides.sort_by_key(|s| s.position.unwrap_or(u32::MAX));

    let mut featured = Vec::new();
    for item_type in ItemType::CATALOG {
        featured.extend(
            store
                .catalog(item_type)
                .await?
                .into_iter()
                .filter(|e| e.featured)
                .take(FEATURED_PER_TYPE),
        );
    }

    let posts = super::blog::published(store.records::<BlogPost>().await?)
        .into_iter()
        .take(RECENT_POSTS)
        .collect();

    Ok(HomeTemplate {
        chrome: PageChrome::load(&state, &session, user, nonce).await,
        slides,
        featured,
        posts,
    })
}
