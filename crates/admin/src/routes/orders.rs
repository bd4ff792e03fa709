//! Order list, detail and status changes.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use atelier_core::{ItemId, ItemType, Order, OrderStatus, Record};

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::routes::render;
use crate::state::AppState;

/// Entry of the status filter.
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "orders/index.html")]
struct OrdersIndexTemplate {
    current_path: &'static str,
    orders: Vec<Order>,
    status_options: Vec<StatusOption>,
}

#[derive(Template)]
#[template(path = "orders/show.html")]
struct OrderShowTemplate {
    current_path: &'static str,
    order: Order,
    next_statuses: Vec<OrderStatus>,
    error: Option<&'static str>,
    success: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderDetailQuery {
    error: Option<String>,
    success: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    status: String,
    #[serde(default)]
    tracking_number: String,
    #[serde(default)]
    note: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(index))
        .route("/orders/{id}", get(show))
        .route("/orders/{id}/status", post(update_status))
}

/// GET /orders
#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<OrderListQuery>,
) -> Result<Html<String>, AppError> {
    let filter = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<OrderStatus>().ok());

    let mut orders = state.store().records::<Order>().await?;
    if let Some(status) = filter {
        orders.retain(|o| o.status == status);
    }
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let status_options = OrderStatus::ALL
        .into_iter()
        .map(|status| StatusOption {
            value: status.as_str(),
            label: status.label(),
            selected: filter == Some(status),
        })
        .collect();

    render(&OrdersIndexTemplate {
        current_path: "/orders",
        orders,
        status_options,
    })
}

/// GET /orders/{id}
#[instrument(skip(state, _admin, query))]
async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    Query(query): Query<OrderDetailQuery>,
) -> Result<Html<String>, AppError> {
    let order = state
        .store()
        .record::<Order>(&ItemId::new(id.as_str()))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    let error = match query.error.as_deref() {
        Some("transition") => Some("That status change is not allowed."),
        Some("status") => Some("Unknown status."),
        _ => None,
    };
    let success = match query.success.as_deref() {
        Some("updated") => Some("Status updated and the customer was emailed."),
        Some("updated_no_email") => {
            Some("Status updated, but the customer email could not be sent.")
        }
        _ => None,
    };

    render(&OrderShowTemplate {
        current_path: "/orders",
        next_statuses: next_statuses(order.status),
        order,
        error,
        success,
    })
}

/// POST /orders/{id}/status
///
/// Writes the new status onto the stored item, then emails the customer.
/// A failed email does not undo the change.
#[instrument(skip(state, _admin, form))]
async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect, AppError> {
    let item_id = ItemId::new(id.as_str());
    let mut item = state
        .store()
        .get_item(&item_id)
        .await?
        .filter(|item| item.item_type == ItemType::Order)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    let current = Order::from_item(item.clone())
        .map_err(|e| AppError::Internal(e.to_string()))?
        .status;

    let Ok(next) = form.status.parse::<OrderStatus>() else {
        return Ok(Redirect::to(&format!("/orders/{id}?error=status")));
    };
    if !current.can_transition_to(next) {
        tracing::warn!(order_id = %id, from = %current, to = %next, "Rejected status change");
        return Ok(Redirect::to(&format!("/orders/{id}?error=transition")));
    }

    item.set_field("status", Value::String(next.as_str().to_string()));
    set_optional_text(&mut item.fields, "trackingNumber", &form.tracking_number);
    set_optional_text(&mut item.fields, "note", &form.note);
    state.store().save_item(&item).await?;
    tracing::info!(order_id = %id, from = %current, to = %next, "Order status changed");

    let order = Order::from_item(item).map_err(|e| AppError::Internal(e.to_string()))?;
    let outcome = match state.notifier().status_changed(&order).await {
        Ok(()) => "updated",
        Err(e) => {
            tracing::error!(order_id = %id, error = %e, "Status email failed");
            "updated_no_email"
        }
    };

    Ok(Redirect::to(&format!("/orders/{id}?success={outcome}")))
}

/// Statuses an order may move to from `current`.
fn next_statuses(current: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .into_iter()
        .filter(|s| current.can_transition_to(*s))
        .collect()
}

/// Set a text field, or leave it alone when the input is blank.
fn set_optional_text(fields: &mut serde_json::Map<String, Value>, name: &str, raw: &str) {
    let value = raw.trim();
    if !value.is_empty() {
        fields.insert(name.to_string(), Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_statuses() {
        assert_eq!(
            next_statuses(OrderStatus::Paid),
            vec![
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
                OrderStatus::Cancelled
            ]
        );
        assert!(next_statuses(OrderStatus::Delivered).is_empty());
        assert!(next_statuses(OrderStatus::Cancelled).is_empty());
    }

    #[test]
    fn test_blank_text_leaves_field() {
        let mut fields = serde_json::Map::new();
        fields.insert("note".to_string(), Value::String("fragile".to_string()));
        set_optional_text(&mut fields, "note", "   ");
        set_optional_text(&mut fields, "trackingNumber", " DTDC99 ");
        assert_eq!(fields["note"], "fragile");
        assert_eq!(fields["trackingNumber"], "DTDC99");
    }
}
