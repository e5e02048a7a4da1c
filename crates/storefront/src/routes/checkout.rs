//! Checkout route handlers.
//!
//! `GET /checkout` renders the summary from the same [`CartTotals`] the
//! commit persists. `POST /checkout` hands the loaded cart to the
//! orchestrator; on success the client is sent to the confirmation page.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bloom_core::{AddressId, CartTotals, IdempotencyKey, OrderId, OrderNumber};

use super::cart::CART_UPDATED_TRIGGER;
use crate::db::{AddressRepository, CartRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{Address, CartLine};
use crate::services::CheckoutRequest;
use crate::state::AppState;

/// Header carrying the idempotency key when the body does not.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Checkout summary.
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
    pub addresses: Vec<Address>,
    pub selected_address_id: Option<AddressId>,
}

/// Place order request body.
#[derive(Debug, Default, Deserialize)]
pub struct PlaceOrderRequest {
    pub address_id: Option<AddressId>,
    pub idempotency_key: Option<String>,
}

/// Place order response.
#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub totals: CartTotals,
    pub cart_cleared: bool,
    pub replayed: bool,
    /// Where the client should go next.
    pub redirect: String,
}

/// The address to preselect: the default, otherwise the first listed.
fn preselect_address(addresses: &[Address]) -> Option<AddressId> {
    addresses
        .iter()
        .find(|a| a.is_default)
        .or_else(|| addresses.first())
        .map(|a| a.id)
}

/// Idempotency key from the body, falling back to the header.
fn idempotency_key(body: Option<&str>, headers: &HeaderMap) -> Result<Option<IdempotencyKey>> {
    let raw = body.or_else(|| {
        headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
    });

    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(IdempotencyKey::parse)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Display the checkout summary.
#[instrument(skip(state, user), fields(owner = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CheckoutView>> {
    let lines = CartRepository::new(state.pool()).lines_for(user.id).await?;
    let addresses = AddressRepository::new(state.pool())
        .list_for_owner(user.id)
        .await?;

    Ok(Json(CheckoutView {
        totals: state.checkout().summarize(&lines),
        selected_address_id: preselect_address(&addresses),
        lines,
        addresses,
    }))
}

/// Commit the cart as an order.
#[instrument(skip(state, auth, headers, request))]
pub async fn place(
    State(state): State<AppState>,
    auth: OptionalAuth,
    headers: HeaderMap,
    request: Option<Json<PlaceOrderRequest>>,
) -> Result<impl IntoResponse> {
    let Json(request) = request.unwrap_or_default();
    let idempotency_key = idempotency_key(request.idempotency_key.as_deref(), &headers)?;
    let owner = auth.user_id();

    // Lines are loaded once here; their prices are the ones the order records.
    let lines = match owner {
        Some(owner) => CartRepository::new(state.pool()).lines_for(owner).await?,
        None => Vec::new(),
    };

    let outcome = state
        .checkout()
        .commit(CheckoutRequest {
            owner,
            shipping_address_id: request.address_id,
            lines,
            idempotency_key,
        })
        .await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", outcome.order_number.as_str())]),
    );

    let response = PlaceOrderResponse {
        redirect: format!("/orders/{}", outcome.order_id),
        order_id: outcome.order_id,
        order_number: outcome.order_number,
        totals: outcome.totals,
        cart_cleared: outcome.cart_cleared,
        replayed: outcome.replayed,
    };

    Ok((AppendHeaders([CART_UPDATED_TRIGGER]), Json(response)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use bloom_core::{AddressType, UserId};
    use chrono::Utc;

    use super::*;

    fn address(id: i32, is_default: bool) -> Address {
        Address {
            id: AddressId::new(id),
            user_id: UserId::new(1),
            address_type: AddressType::Home,
            label: format!("Address {id}"),
            street: "1 Main St".to_string(),
            city: "Boise".to_string(),
            state: "ID".to_string(),
            postal_code: "83702".to_string(),
            country: "US".to_string(),
            is_default,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_preselect_prefers_default() {
        let addresses = [address(1, false), address(2, true)];
        assert_eq!(preselect_address(&addresses), Some(AddressId::new(2)));
    }

    #[test]
    fn test_preselect_falls_back_to_first() {
        let addresses = [address(3, false), address(4, false)];
        assert_eq!(preselect_address(&addresses), Some(AddressId::new(3)));
        assert_eq!(preselect_address(&[]), None);
    }

    #[test]
    fn test_idempotency_key_sources() {
        let mut headers = HeaderMap::new();
        assert!(idempotency_key(None, &headers).unwrap().is_none());

        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(
            idempotency_key(None, &headers).unwrap().unwrap().as_str(),
            "from-header"
        );
        assert_eq!(
            idempotency_key(Some("from-body"), &headers)
                .unwrap()
                .unwrap()
                .as_str(),
            "from-body"
        );
        assert!(idempotency_key(Some("  "), &HeaderMap::new()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_idempotency_key_is_bad_request() {
        let err = idempotency_key(Some("not a key!"), &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
