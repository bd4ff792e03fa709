//! Console login and logout.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use askama::Template;
use axum::{
    Form, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user, set_sentry_admin};
use crate::middleware::{clear_current_admin, is_signed_in, login_rate_limiter, set_current_admin};
use crate::models::CurrentAdmin;
use crate::routes::{MessageQuery, render};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: Option<&'static str>,
    notice: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    password: String,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(login_page).merge(post(login).route_layer(login_rate_limiter())),
        )
        .route("/logout", post(logout))
}

/// GET /login
async fn login_page(
    session: Session,
    Query(query): Query<MessageQuery>,
) -> Result<Response, AppError> {
    if is_signed_in(&session).await {
        return Ok(Redirect::to("/").into_response());
    }

    let notice = query
        .success
        .as_deref()
        .filter(|s| *s == "logged_out")
        .map(|_| "You have been logged out.");
    Ok(render(&LoginTemplate {
        error: None,
        notice,
    })?
    .into_response())
}

/// POST /login
#[instrument(skip(state, session, form))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if !password_matches(state.config().password_hash(), &form.password) {
        tracing::warn!("Admin login failed");
        let page = render(&LoginTemplate {
            error: Some("Incorrect password."),
            notice: None,
        })?;
        return Ok((StatusCode::UNAUTHORIZED, page).into_response());
    }

    set_current_admin(&session, &CurrentAdmin::now()).await?;
    set_sentry_admin();
    tracing::info!("Admin logged in");

    Ok(Redirect::to("/").into_response())
}

/// POST /logout
async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_current_admin(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/login?success=logged_out"))
}

/// Check a password against the configured Argon2 PHC string.
fn password_matches(hash: &str, password: &str) -> bool {
    if password.is_empty() {
        return false;
    }
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHasher, SaltString, rand_core::OsRng};

    fn hash(password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_password_matches() {
        let hash = hash("glaze-and-fire-7");
        assert!(password_matches(&hash, "glaze-and-fire-7"));
        assert!(!password_matches(&hash, "glaze-and-fire-8"));
        assert!(!password_matches(&hash, ""));
    }

    #[test]
    fn test_unparseable_hash_never_matches() {
        assert!(!password_matches("not-a-phc-string", "anything"));
    }

    #[test]
    fn test_login_page_renders_error() {
        let html = LoginTemplate {
            error: Some("Incorrect password."),
            notice: None,
        }
        .render()
        .unwrap();
        assert!(html.contains("Incorrect password."));
        assert!(html.contains("name=\"password\""));
    }
}
