//! Authentication route handlers.
//!
//! Email and password accounts stored as `user` items. Logging in or
//! registering folds the guest cart into the customer's server cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::Customer;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{CspNonce, OptionalUser, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::routes::{MessageQuery, PageChrome};
use crate::services::{AuthError, AuthService, CartService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub chrome: PageChrome,
    pub email: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub chrome: PageChrome,
    pub name: String,
    pub email: String,
    pub error: Option<String>,
}

/// Whether an auth failure is the visitor's to fix (shown on the form).
const fn is_form_error(err: &AuthError) -> bool {
    matches!(
        err,
        AuthError::InvalidCredentials
            | AuthError::InvalidEmail(_)
            | AuthError::WeakPassword(_)
            | AuthError::MissingName
            | AuthError::UserAlreadyExists
    )
}

/// Form banner for an auth failure.
fn form_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidCredentials | AuthError::InvalidEmail(_) => {
            "Incorrect email or password.".to_string()
        }
        AuthError::WeakPassword(msg) => msg.clone(),
        AuthError::MissingName => "Please enter your name.".to_string(),
        AuthError::UserAlreadyExists => {
            "An account with this email already exists. Try logging in.".to_string()
        }
        AuthError::Store(_) | AuthError::PasswordHash => {
            "Something went wrong. Please try again.".to_string()
        }
    }
}

/// Put `customer` in the session and merge the guest cart.
async fn start_session(state: &AppState, session: &Session, customer: &Customer) -> Result<()> {
    let user = CurrentUser::from(customer);
    set_current_user(session, &user).await?;

    if let Err(e) = CartService::new(state.store(), session, Some(&user))
        .merge_guest_into(&user)
        .await
    {
        tracing::warn!(user_id = %user.id, error = %e, "Guest cart merge failed");
    }

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    CspNonce(nonce): CspNonce,
    Query(query): Query<MessageQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }

    LoginTemplate {
        chrome: PageChrome::load(&state, &session, user, nonce).await,
        email: String::new(),
        error: query.error.map(|_| "Please log in to continue.".to_string()),
        success: query
            .success
            .map(|_| "You have been logged out.".to_string()),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, nonce, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match AuthService::new(state.store())
        .login(&form.email, &form.password)
        .await
    {
        Ok(customer) => {
            start_session(&state, &session, &customer).await?;
            tracing::info!(user_id = %customer.id, "Customer logged in");
            Ok(Redirect::to("/account").into_response())
        }
        Err(e) if is_form_error(&e) => {
            tracing::warn!(error = %e, "Login failed");
            let page = LoginTemplate {
                chrome: PageChrome::load(&state, &session, None, nonce).await,
                email: form.email,
                error: Some(form_message(&e)),
                success: None,
            };
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(e) => Err(AppError::Auth(e)),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    CspNonce(nonce): CspNonce,
) -> Response {
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }

    RegisterTemplate {
        chrome: PageChrome::load(&state, &session, user, nonce).await,
        name: String::new(),
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle registration form submission.
///
/// An email that only has a checkout-created account is claimed by setting
/// its password.
#[instrument(skip(state, session, nonce, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let outcome = if form.password == form.password_confirm {
        AuthService::new(state.store())
            .register(&form.name, &form.email, &form.password)
            .await
    } else {
        Err(AuthError::WeakPassword("Passwords do not match.".to_string()))
    };

    match outcome {
        Ok(customer) => {
            start_session(&state, &session, &customer).await?;
            Ok(Redirect::to("/account").into_response())
        }
        Err(e) if is_form_error(&e) => {
            tracing::warn!(error = %e, "Registration failed");
            let page = RegisterTemplate {
                chrome: PageChrome::load(&state, &session, None, nonce).await,
                error: Some(form_message(&e)),
                name: form.name,
                email: form.email,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(e) => Err(AppError::Auth(e)),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/auth/login?success=logged_out"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_do_not_reveal_which_part_failed() {
        let bad_password = form_message(&AuthError::InvalidCredentials);
        let bad_email = form_message(&AuthError::InvalidEmail(
            atelier_core::EmailError::Empty,
        ));
        assert_eq!(bad_password, bad_email);
    }

    #[test]
    fn test_upstream_errors_are_not_form_errors() {
        assert!(!is_form_error(&AuthError::PasswordHash));
        assert!(is_form_error(&AuthError::UserAlreadyExists));
    }
}
