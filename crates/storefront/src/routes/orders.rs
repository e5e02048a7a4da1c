//! Order history and confirmation handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use bloom_core::{Money, OrderId, OrderNumber, OrderStatus};

use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::Order;
use crate::services::OrderConfirmation;
use crate::state::AppState;

/// One row of the order history list.
#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            status: order.status,
            total_amount: order.total_amount,
            created_at: order.created_at,
        }
    }
}

/// List the shopper's orders, newest first.
#[instrument(skip(state, auth))]
pub async fn index(
    State(state): State<AppState>,
    auth: OptionalAuth,
) -> Result<Json<Vec<OrderSummary>>> {
    let orders = state.confirmation().history(auth.user_id()).await?;
    Ok(Json(orders.into_iter().map(OrderSummary::from).collect()))
}

/// Order confirmation page.
#[instrument(skip(state, auth), fields(order_id = %order_id))]
pub async fn show(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderConfirmation>> {
    let confirmation = state
        .confirmation()
        .read(order_id, auth.user_id())
        .await?;
    Ok(Json(confirmation))
}
