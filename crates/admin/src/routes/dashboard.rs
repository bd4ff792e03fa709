//! Dashboard route handler.

use askama::Template;
use axum::{Router, extract::State, response::Html, routing::get};
use tracing::instrument;

use atelier_core::{ItemType, Order, OrderStatus, Price};

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::routes::render;
use crate::state::AppState;

/// Orders shown on the dashboard.
const RECENT_ORDERS: usize = 8;

/// Item count for one type.
#[derive(Debug, Clone)]
pub struct TypeCount {
    pub item_type: ItemType,
    pub count: usize,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    current_path: &'static str,
    counts: Vec<TypeCount>,
    recent_orders: Vec<Order>,
    revenue: Price,
    open_orders: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// GET /
#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Html<String>, AppError> {
    let mut counts = Vec::with_capacity(ItemType::ALL.len());
    for item_type in ItemType::ALL {
        let count = state.store().items_by_type(item_type).await?.len();
        counts.push(TypeCount { item_type, count });
    }

    let mut orders = state.store().records::<Order>().await?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let revenue = revenue(&orders);
    let open_orders = orders
        .iter()
        .filter(|o| matches!(o.status, OrderStatus::Paid | OrderStatus::Processing))
        .count();
    orders.truncate(RECENT_ORDERS);

    render(&DashboardTemplate {
        current_path: "/",
        counts,
        recent_orders: orders,
        revenue,
        open_orders,
    })
}

/// Sum of order totals that were actually paid.
fn revenue(orders: &[Order]) -> Price {
    orders
        .iter()
        .filter(|o| !matches!(o.status, OrderStatus::Pending | OrderStatus::Cancelled))
        .map(Order::total_price)
        .sum()
}
