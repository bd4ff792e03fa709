//! Newsletter signup.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::store::ItemStoreClient;
use atelier_core::{Email, ItemId, Subscriber};

use crate::error::Result;
use crate::middleware::{CspNonce, OptionalUser};
use crate::routes::PageChrome;
use crate::state::AppState;

/// Signup form data.
#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub email: String,
}

/// Signup result template.
#[derive(Template, WebTemplate)]
#[template(path = "newsletter/result.html")]
pub struct SubscribeTemplate {
    pub chrome: PageChrome,
    pub message: &'static str,
    pub ok: bool,
}

/// Outcome of a signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signup {
    Created,
    Reactivated,
    AlreadySubscribed,
}

impl Signup {
    const fn message(self) -> &'static str {
        match self {
            Self::Created => "Thanks for subscribing! Studio news will reach your inbox.",
            Self::Reactivated => "Welcome back! Your subscription is active again.",
            Self::AlreadySubscribed => "You're already on the list.",
        }
    }
}

/// Subscribe `email`, reusing an existing subscriber item for the address.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub async fn subscribe_email(
    store: &ItemStoreClient,
    email: Email,
) -> std::result::Result<Signup, atelier_core::store::StoreError> {
    let existing = store
        .find_records::<Subscriber>("email", email.as_str())
        .await?
        .into_iter()
        .find(|s| s.email == email);

    match existing {
        Some(subscriber) if subscriber.active => Ok(Signup::AlreadySubscribed),
        Some(subscriber) => {
            store
                .save_record(Subscriber {
                    active: true,
                    subscribed_at: Some(Utc::now()),
                    ..subscriber
                })
                .await?;
            Ok(Signup::Reactivated)
        }
        None => {
            store
                .save_record(Subscriber {
                    id: ItemId::generate(),
                    email,
                    active: true,
                    subscribed_at: Some(Utc::now()),
                    extra: serde_json::Map::new(),
                })
                .await?;
            Ok(Signup::Created)
        }
    }
}

/// Handle the signup form.
#[instrument(skip(state, session, user, nonce, form))]
pub async fn subscribe(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    CspNonce(nonce): CspNonce,
    Form(form): Form<SubscribeForm>,
) -> Result<Response> {
    let Ok(email) = Email::parse(&form.email) else {
        let page = SubscribeTemplate {
            chrome: PageChrome::load(&state, &session, user, nonce).await,
            message: "Please enter a valid email address.",
            ok: false,
        };
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    };

    let signup = subscribe_email(state.store(), email).await?;
    tracing::info!(outcome = ?signup, "Newsletter signup");

    Ok(SubscribeTemplate {
        chrome: PageChrome::load(&state, &session, user, nonce).await,
        message: signup.message(),
        ok: true,
    }
    .into_response())
}
