//! Newsletter subscribers and broadcasts.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use atelier_core::Subscriber;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::routes::render;
use crate::services::newsletter::recipients;
use crate::services::{Issue, spawn_broadcast};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "newsletter/index.html")]
struct NewsletterTemplate {
    current_path: &'static str,
    subscribers: Vec<Subscriber>,
    active_count: usize,
    subject: String,
    body: String,
    error: Option<&'static str>,
    notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewsletterQuery {
    success: Option<String>,
    count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ComposeForm {
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/newsletter", get(index))
        .route("/newsletter/send", post(send))
}

/// GET /newsletter
#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<NewsletterQuery>,
) -> Result<Html<String>, AppError> {
    let subscribers = load_subscribers(&state).await?;
    let notice = match (query.success.as_deref(), query.count) {
        (Some("started"), Some(count)) => Some(started_notice(count)),
        _ => None,
    };

    render(&NewsletterTemplate {
        current_path: "/newsletter",
        active_count: recipients(&subscribers).len(),
        subscribers,
        subject: String::new(),
        body: String::new(),
        error: None,
        notice,
    })
}

/// POST /newsletter/send
///
/// Starts the broadcast in the background and redirects straight away.
#[instrument(skip(state, _admin, form))]
async fn send(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Form(form): Form<ComposeForm>,
) -> Result<Response, AppError> {
    let subject = form.subject.trim().to_string();
    let body = form.body.trim().to_string();

    let subscribers = load_subscribers(&state).await?;
    let to = recipients(&subscribers);

    let error = if subject.is_empty() || body.is_empty() {
        Some("Subject and message are both required.")
    } else if to.is_empty() {
        Some("There are no active subscribers.")
    } else {
        None
    };

    if let Some(error) = error {
        let page = render(&NewsletterTemplate {
            current_path: "/newsletter",
            active_count: to.len(),
            subscribers,
            subject,
            body,
            error: Some(error),
            notice: None,
        })?;
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    let issue = Issue::compose(&state.config().studio_name, &subject, &body)?;
    let count = to.len();
    spawn_broadcast(
        state.mail().clone(),
        issue,
        to,
        state.config().newsletter_delay,
    );

    Ok(Redirect::to(&format!("/newsletter?success=started&count={count}")).into_response())
}

/// Subscribers, newest first.
async fn load_subscribers(state: &AppState) -> Result<Vec<Subscriber>, AppError> {
    let mut subscribers = state.store().records::<Subscriber>().await?;
    subscribers.sort_by(|a, b| b.subscribed_at.cmp(&a.subscribed_at));
    Ok(subscribers)
}

fn started_notice(count: usize) -> String {
    if count == 1 {
        "Sending to 1 subscriber.".to_string()
    } else {
        format!("Sending to {count} subscribers.")
    }
}
