//! Cart route handlers.
//!
//! Mutations are plain form posts that redirect back to `/cart`; problems
//! are reported through the `error` banner code.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::cart::{Cart, CartLine};
use atelier_core::{CatalogEntry, ItemId, ProductId};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{CspNonce, OptionalUser};
use crate::routes::{MessageQuery, PageChrome};
use crate::services::CartService;
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub chrome: PageChrome,
    pub cart: Cart,
    pub error: Option<&'static str>,
}

/// Banner text for a cart error code.
fn error_message(code: &str) -> Option<&'static str> {
    match code {
        "stock" => Some("Sorry, there are not enough places or units left for that quantity."),
        "unavailable" => Some("That item is no longer available."),
        "empty" => Some("Your cart is empty."),
        _ => None,
    }
}

/// Look up a purchasable catalog entry by id.
async fn catalog_entry(state: &AppState, product_id: &str) -> Result<Option<CatalogEntry>> {
    let item = state.store().get_item(&ItemId::new(product_id)).await?;
    Ok(item
        .filter(|i| i.item_type.is_catalog())
        .and_then(|i| CatalogEntry::from_item(i).ok()))
}

/// Display cart page.
#[instrument(skip(state, session, user, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    CspNonce(nonce): CspNonce,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let cart = CartService::new(state.store(), &session, user.as_ref())
        .load()
        .await?;

    Ok(CartShowTemplate {
        chrome: PageChrome::load(&state, &session, user, nonce).await,
        cart,
        error: query.error.as_deref().and_then(error_message),
    })
}

/// Add an entry to the cart.
#[instrument(skip(state, session, user))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect> {
    let quantity = form.quantity.unwrap_or(1).max(1);
    let Some(entry) = catalog_entry(&state, &form.product_id).await? else {
        return Ok(Redirect::to("/cart?error=unavailable"));
    };

    let carts = CartService::new(state.store(), &session, user.as_ref());
    let in_cart = carts
        .load()
        .await?
        .line(&entry.product_id())
        .map_or(0, |l| l.quantity);
    if !entry.has_stock_for(in_cart.saturating_add(quantity)) {
        return Ok(Redirect::to("/cart?error=stock"));
    }

    carts.add(CartLine::for_entry(&entry, quantity)).await?;
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", form.product_id.as_str())]));

    Ok(Redirect::to("/cart"))
}

/// Set a line's quantity; zero removes it.
#[instrument(skip(state, session, user))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect> {
    if form.quantity > 0
        && let Some(entry) = catalog_entry(&state, &form.product_id).await?
        && !entry.has_stock_for(form.quantity)
    {
        return Ok(Redirect::to("/cart?error=stock"));
    }

    let product_id = ProductId::new(form.product_id);
    CartService::new(state.store(), &session, user.as_ref())
        .set_quantity(&product_id, form.quantity)
        .await?;

    Ok(Redirect::to("/cart"))
}

/// Remove a line.
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect> {
    let product_id = ProductId::new(form.product_id);
    CartService::new(state.store(), &session, user.as_ref())
        .remove(&product_id)
        .await?;

    Ok(Redirect::to("/cart"))
}

/// Number of units in the cart, as text for the header badge.
#[instrument(skip(state, session, user))]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
) -> Result<String> {
    let cart = CartService::new(state.store(), &session, user.as_ref())
        .load()
        .await?;
    Ok(cart.item_count().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert!(error_message("stock").is_some());
        assert!(error_message("unavailable").is_some());
        assert!(error_message("<script>").is_none());
    }
}
