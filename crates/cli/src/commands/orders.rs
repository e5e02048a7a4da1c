//! Order administration commands.

use tracing::info;

use bloom_core::{OrderId, OrderStatus};
use bloom_storefront::db::PgCheckoutStore;
use bloom_storefront::services::OrderAdminService;

use super::{CliError, connect};

/// List recent orders, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn list(status: Option<OrderStatus>) -> Result<(), CliError> {
    let pool = connect().await?;
    let service = OrderAdminService::new(PgCheckoutStore::new(pool));

    let orders = service.list(status).await?;
    if orders.is_empty() {
        info!("No orders found");
        return Ok(());
    }

    for order in &orders {
        info!(
            "{:>6}  {}  {:<10}  {:>10}  {}",
            order.id,
            order.order_number,
            order.status,
            order.total_amount,
            order.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
    info!("{} order(s)", orders.len());

    Ok(())
}

/// Move an order to `status`.
///
/// # Errors
///
/// Returns an error if the order is missing, the transition is not allowed,
/// or the order changed concurrently.
pub async fn set_status(order_id: OrderId, status: OrderStatus) -> Result<(), CliError> {
    let pool = connect().await?;
    let service = OrderAdminService::new(PgCheckoutStore::new(pool));

    let order = service.transition(order_id, status).await?;
    info!(
        order_number = %order.order_number,
        status = %order.status,
        "Order updated"
    );

    let next = order.status.allowed_transitions();
    if !next.is_empty() {
        let names: Vec<&str> = next.iter().map(|s| s.as_str()).collect();
        info!("Next allowed: {}", names.join(", "));
    }

    Ok(())
}
