//! Order confirmation page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::{ItemId, Order};

use crate::error::{AppError, Result};
use crate::middleware::{CspNonce, OptionalUser};
use crate::models::{CurrentUser, session_keys};
use crate::routes::PageChrome;
use crate::state::AppState;

/// Thank-you page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/thank_you.html")]
pub struct ThankYouTemplate {
    pub chrome: PageChrome,
    pub order: Order,
}

/// Whether this visitor may see `order`: it was just paid in this session or
/// it belongs to the logged-in customer.
fn may_view(order: &Order, last_order: Option<&str>, user: Option<&CurrentUser>) -> bool {
    last_order == Some(order.id.as_str())
        || user.is_some_and(|u| order.user_id.as_ref() == Some(&u.id))
}

/// Display the confirmation for a paid order.
#[instrument(skip(state, session, user, nonce))]
pub async fn thank_you(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: Session,
    OptionalUser(user): OptionalUser,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let not_found = || AppError::NotFound(format!("order {id}"));

    let last_order = session.get::<String>(session_keys::LAST_ORDER).await?;
    let order = state
        .store()
        .record::<Order>(&ItemId::new(id.as_str()))
        .await?
        .ok_or_else(not_found)?;

    if !may_view(&order, last_order.as_deref(), user.as_ref()) {
        return Err(not_found());
    }

    Ok(ThankYouTemplate {
        chrome: PageChrome::load(&state, &session, user, nonce).await,
        order,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use atelier_core::{Email, OrderStatus, UserId};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn order(user: Option<&str>) -> Order {
        Order {
            id: ItemId::new("o1"),
            user_id: user.map(UserId::new),
            customer_name: "Meera".to_string(),
            email: Email::parse("meera@example.in").unwrap(),
            phone: None,
            address: None,
            lines: Vec::new(),
            subtotal: Decimal::ZERO,
            shipping_fee: Decimal::ZERO,
            total: Decimal::ZERO,
            status: OrderStatus::Paid,
            razorpay_order_id: None,
            razorpay_payment_id: None,
            tracking_number: None,
            note: None,
            created_at: Utc::now(),
        }
    }

    fn user(id: &str) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse("meera@example.in").unwrap(),
            name: "Meera".to_string(),
        }
    }

    #[test]
    fn test_last_order_in_session_may_view() {
        assert!(may_view(&order(None), Some("o1"), None));
        assert!(!may_view(&order(None), Some("o2"), None));
    }

    #[test]
    fn test_owner_may_view() {
        assert!(may_view(&order(Some("u1")), None, Some(&user("u1"))));
        assert!(!may_view(&order(Some("u1")), None, Some(&user("u2"))));
        assert!(!may_view(&order(None), None, Some(&user("u1"))));
    }
}
