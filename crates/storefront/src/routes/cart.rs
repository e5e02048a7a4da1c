//! Cart route handlers.
//!
//! Every mutation answers with the refreshed cart, sets the `HX-Trigger:
//! cart-updated` header for the page, and publishes a
//! [`CartEvent::CartChanged`] for other open views of the same shopper.

use axum::{
    Json,
    extract::State,
    response::{AppendHeaders, IntoResponse},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bloom_core::{CartLineId, CartTotals, ProductId, UserId};

use crate::db::{CartRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CartLine, MAX_LINE_QUANTITY};
use crate::services::CartEvent;
use crate::state::AppState;

/// Header that tells the page to refresh cart widgets.
pub(crate) const CART_UPDATED_TRIGGER: (&str, &str) = ("HX-Trigger", "cart-updated");

/// Cart contents with totals.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub line_id: CartLineId,
    pub quantity: u32,
}

/// Remove line request body.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub line_id: CartLineId,
}

/// Cart count badge.
#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: i64,
}

fn check_quantity(quantity: u32) -> Result<u32> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "quantity must be at most {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(quantity)
}

async fn load_cart(state: &AppState, owner: UserId) -> Result<CartView> {
    let lines = CartRepository::new(state.pool()).lines_for(owner).await?;
    let totals = state.checkout().summarize(&lines);
    Ok(CartView { lines, totals })
}

fn cart_changed(state: &AppState, owner: UserId) {
    state.events().publish(CartEvent::CartChanged { owner });
}

/// Display the cart.
#[instrument(skip(state, user), fields(owner = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    Ok(Json(load_cart(&state, user.id).await?))
}

/// Add a product to the cart.
#[instrument(skip(state, user), fields(owner = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<AddToCartRequest>,
) -> Result<impl IntoResponse> {
    let quantity = check_quantity(request.quantity.unwrap_or(1).max(1))?;

    CartRepository::new(state.pool())
        .add(user.id, request.product_id, quantity)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::NotFound(format!("product {}", request.product_id))
            }
            other => other.into(),
        })?;

    cart_changed(&state, user.id);
    let cart = load_cart(&state, user.id).await?;
    Ok((AppendHeaders([CART_UPDATED_TRIGGER]), Json(cart)))
}

/// Change a line's quantity. Zero removes the line.
#[instrument(skip(state, user), fields(owner = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<UpdateCartRequest>,
) -> Result<impl IntoResponse> {
    let quantity = check_quantity(request.quantity)?;

    CartRepository::new(state.pool())
        .set_quantity(user.id, request.line_id, quantity)
        .await?;

    cart_changed(&state, user.id);
    let cart = load_cart(&state, user.id).await?;
    Ok((AppendHeaders([CART_UPDATED_TRIGGER]), Json(cart)))
}

/// Remove a line from the cart.
#[instrument(skip(state, user), fields(owner = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<RemoveFromCartRequest>,
) -> Result<impl IntoResponse> {
    CartRepository::new(state.pool())
        .remove(user.id, request.line_id)
        .await?;

    cart_changed(&state, user.id);
    let cart = load_cart(&state, user.id).await?;
    Ok((AppendHeaders([CART_UPDATED_TRIGGER]), Json(cart)))
}

/// Units in the cart, for the header badge.
#[instrument(skip(state, user), fields(owner = %user.id))]
pub async fn count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartCount>> {
    let count = CartRepository::new(state.pool()).count(user.id).await?;
    Ok(Json(CartCount { count }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_quantity() {
        assert_eq!(check_quantity(0).unwrap(), 0);
        assert_eq!(check_quantity(99).unwrap(), 99);
        assert!(matches!(check_quantity(100), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_add_request_quantity_is_optional() {
        let request: AddToCartRequest = serde_json::from_str(r#"{"product_id": 4}"#).unwrap();
        assert_eq!(request.product_id, ProductId::new(4));
        assert!(request.quantity.is_none());
    }
}
