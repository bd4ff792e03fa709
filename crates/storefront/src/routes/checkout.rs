//! Checkout, payment page, gateway order creation and payment confirmation.
//!
//! Checkout stages a [`PendingOrder`] in the session and sends the visitor to
//! `/payment` with a signed handoff token. The payment page creates a
//! Razorpay order for exactly the staged total; the gateway's success
//! callback is verified server-side before the order is written.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::Price;
use atelier_core::cart::Cart;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{CspNonce, OptionalUser};
use crate::models::{CurrentUser, session_keys};
use crate::routes::PageChrome;
use crate::services::orders::{self, CheckoutForm, PaymentConfirmation};
use crate::services::{CartService, CheckoutError, HandoffToken, OrderService, PendingOrder};
use crate::state::AppState;

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/form.html")]
pub struct CheckoutTemplate {
    pub chrome: PageChrome,
    pub cart: Cart,
    pub form: CheckoutForm,
    pub needs_shipping: bool,
    pub shipping_fee: Price,
    pub total: Price,
    pub error: Option<String>,
}

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub chrome: PageChrome,
    pub pending: PendingOrder,
    pub amount: String,
}

/// Query parameters of the payment page.
#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    pub token: String,
}

/// Body of `POST /api/razorpay/order`. The amount is in rupees.
#[derive(Debug, Deserialize)]
pub struct GatewayOrderRequest {
    pub amount: serde_json::Value,
}

/// Response of `POST /api/razorpay/order`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrderResponse {
    pub order_id: String,
    pub key_id: String,
    pub receipt: String,
}

async fn pending_order(session: &Session) -> Result<PendingOrder> {
    session
        .get::<PendingOrder>(session_keys::PENDING_ORDER)
        .await?
        .ok_or_else(|| AppError::BadRequest("No order is awaiting payment".to_string()))
}

/// Render the checkout form for `cart`.
async fn checkout_page(
    state: &AppState,
    session: &Session,
    user: Option<CurrentUser>,
    nonce: String,
    cart: Cart,
    form: CheckoutForm,
    error: Option<String>,
) -> Result<CheckoutTemplate> {
    let needs_shipping = cart.needs_shipping();
    let shipping_fee = if needs_shipping {
        Price::inr(state.account_config().await?.shipping_fee)
    } else {
        Price::inr(rust_decimal::Decimal::ZERO)
    };
    let total = Price::inr(cart.subtotal().amount + shipping_fee.amount);

    Ok(CheckoutTemplate {
        chrome: PageChrome::load(state, session, user, nonce).await,
        cart,
        form,
        needs_shipping,
        shipping_fee,
        total,
        error,
    })
}

/// Display the checkout form, prefilled for logged-in customers.
#[instrument(skip(state, session, user, nonce))]
pub async fn form(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    CspNonce(nonce): CspNonce,
) -> Result<Response> {
    let cart = CartService::new(state.store(), &session, user.as_ref())
        .load()
        .await?;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart?error=empty").into_response());
    }

    let form = user
        .as_ref()
        .map(|u| CheckoutForm {
            name: u.name.clone(),
            email: u.email.to_string(),
            ..CheckoutForm::default()
        })
        .unwrap_or_default();

    Ok(checkout_page(&state, &session, user, nonce, cart, form, None)
        .await?
        .into_response())
}

/// Stage the order and hand off to the payment page.
#[instrument(skip(state, session, user, nonce, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    CspNonce(nonce): CspNonce,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let cart = CartService::new(state.store(), &session, user.as_ref())
        .load()
        .await?;
    let shipping_fee = state.account_config().await?.shipping_fee;

    let pending = match orders::stage(&form, &cart, shipping_fee, user.as_ref()) {
        Ok(pending) => pending,
        Err(CheckoutError::EmptyCart) => {
            return Ok(Redirect::to("/cart?error=empty").into_response());
        }
        Err(e) => {
            let page =
                checkout_page(&state, &session, user, nonce, cart, form, Some(e.to_string()))
                    .await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let amount_paise = pending
        .amount_paise()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let token = HandoffToken::new(pending.order_ref.clone(), amount_paise, pending.email.as_str());
    session.insert(session_keys::PENDING_ORDER, &pending).await?;
    tracing::info!(order_ref = %pending.order_ref, total = %pending.total, "Order staged");

    let signed = state
        .handoff()
        .sign(&token)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let url = format!("/payment?token={}", urlencoding::encode(&signed));
    Ok(Redirect::to(&url).into_response())
}

/// Display the payment page for a valid handoff token.
#[instrument(skip(state, session, user, nonce, query))]
pub async fn payment_page(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    CspNonce(nonce): CspNonce,
    Query(query): Query<PaymentQuery>,
) -> Result<impl IntoResponse> {
    let token = state.handoff().verify(&query.token)?;
    let pending = pending_order(&session).await?;

    if pending.order_ref != token.order_ref
        || pending.amount_paise().ok() != Some(token.amount_paise)
    {
        tracing::warn!(order_ref = %token.order_ref, "Handoff token does not match staged order");
        return Err(AppError::BadRequest(
            "This payment link does not match your order".to_string(),
        ));
    }

    Ok(PaymentTemplate {
        chrome: PageChrome::load(&state, &session, user, nonce).await,
        amount: pending.total.to_string(),
        pending,
    })
}

/// Create the gateway order for the staged total.
///
/// The requested amount must equal the staged total.
#[instrument(skip(state, session))]
pub async fn create_gateway_order(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<GatewayOrderRequest>,
) -> Result<Json<GatewayOrderResponse>> {
    let mut pending = pending_order(&session).await?;

    let amount = Price::parse_amount(&request.amount)
        .map_err(|_| AppError::BadRequest("Invalid amount".to_string()))?;
    if amount != pending.total {
        tracing::warn!(requested = %amount, staged = %pending.total, "Gateway amount mismatch");
        return Err(AppError::BadRequest(
            "Amount does not match the order total".to_string(),
        ));
    }
    let amount_paise = pending
        .amount_paise()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let gateway_order = state
        .razorpay()
        .create_order(amount_paise, &pending.order_ref)
        .await?;
    pending.gateway_order_id = Some(gateway_order.id.clone());
    session.insert(session_keys::PENDING_ORDER, &pending).await?;

    Ok(Json(GatewayOrderResponse {
        order_id: gateway_order.id,
        key_id: state.razorpay().key_id().to_string(),
        receipt: pending.order_ref,
    }))
}

/// Handle the gateway success callback.
#[instrument(skip(state, session, user, payment), fields(gateway_order_id = %payment.razorpay_order_id))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    Form(payment): Form<PaymentConfirmation>,
) -> Result<Redirect> {
    let pending = pending_order(&session).await?;

    let order = OrderService::new(state.store(), state.razorpay(), state.notifier())
        .confirm(pending, &payment)
        .await?;

    if let Err(e) = CartService::new(state.store(), &session, user.as_ref())
        .clear()
        .await
    {
        tracing::warn!(order_id = %order.id, error = %e, "Could not clear cart after payment");
    }
    session
        .remove::<PendingOrder>(session_keys::PENDING_ORDER)
        .await?;
    session
        .insert(session_keys::LAST_ORDER, order.id.as_str())
        .await?;
    add_breadcrumb("checkout", "Order paid", Some(&[("order_id", order.id.as_str())]));

    Ok(Redirect::to(&format!("/orders/{}/thank-you", order.id)))
}
