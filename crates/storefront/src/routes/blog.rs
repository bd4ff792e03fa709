//! Blog route handlers.
//!
//! Post bodies are HTML authored in the admin console and rendered as-is.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::BlogPost;

use crate::error::{AppError, Result};
use crate::middleware::{CspNonce, OptionalUser};
use crate::routes::PageChrome;
use crate::state::AppState;

/// Blog listing template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/index.html")]
pub struct BlogIndexTemplate {
    pub chrome: PageChrome,
    pub posts: Vec<BlogPost>,
}

/// Blog post template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/show.html")]
pub struct BlogShowTemplate {
    pub chrome: PageChrome,
    pub post: BlogPost,
}

/// Non-draft posts, newest first. Undated posts sort last.
pub(crate) fn published(posts: Vec<BlogPost>) -> Vec<BlogPost> {
    let mut posts: Vec<BlogPost> = posts.into_iter().filter(|p| !p.draft).collect();
    posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    posts
}

/// List published posts.
#[instrument(skip(state, session, user, nonce))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let posts = published(state.store().records::<BlogPost>().await?);

    Ok(BlogIndexTemplate {
        chrome: PageChrome::load(&state, &session, user, nonce).await,
        posts,
    })
}

/// Show one published post.
#[instrument(skip(state, session, user, nonce))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    session: Session,
    OptionalUser(user): OptionalUser,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let post = published(state.store().records::<BlogPost>().await?)
        .into_iter()
        .find(|p| p.url_key() == slug || p.id.as_str() == slug)
        .ok_or_else(|| AppError::NotFound(format!("post {slug}")))?;

    Ok(BlogShowTemplate {
        chrome: PageChrome::load(&state, &session, user, nonce).await,
        post,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::ItemId;

    fn post(id: &str, date: Option<&str>, draft: bool) -> BlogPost {
        BlogPost {
            id: ItemId::new(id),
            slug: None,
            title: id.to_string(),
            author: None,
            image: None,
            summary: None,
            content: String::new(),
            published_at: date.map(String::from),
            draft,
        }
    }

    #[test]
    fn test_published_hides_drafts_and_sorts_newest_first() {
        let posts = published(vec![
            post("old", Some("2024-01-10"), false),
            post("draft", Some("2025-01-01"), true),
            post("undated", None, false),
            post("new", Some("2024-06-02"), false),
        ]);
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["new", "old", "undated"]);
    }
}
