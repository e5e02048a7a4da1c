//! Saved address handlers.
//!
//! These routes require authentication. Every query is scoped to the
//! signed-in shopper, so a foreign address id behaves like a missing one.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use bloom_core::AddressId;

use crate::db::AddressRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Address, AddressInput};
use crate::state::AppState;

/// List saved addresses, default first.
#[instrument(skip(state, user), fields(owner = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    let addresses = AddressRepository::new(state.pool())
        .list_for_owner(user.id)
        .await?;
    Ok(Json(addresses))
}

/// Save a new address.
#[instrument(skip(state, user, input), fields(owner = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<AddressInput>,
) -> Result<(StatusCode, Json<Address>)> {
    input.validate().map_err(AppError::Validation)?;

    let address = AddressRepository::new(state.pool())
        .create(user.id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// Replace an address.
#[instrument(skip(state, user, input), fields(owner = %user.id, address_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(input): Json<AddressInput>,
) -> Result<Json<Address>> {
    input.validate().map_err(AppError::Validation)?;

    let address = AddressRepository::new(state.pool())
        .update(id, user.id, &input)
        .await?;
    Ok(Json(address))
}

/// Delete an address.
///
/// Orders placed with it keep their record and show the address as
/// unavailable.
#[instrument(skip(state, user), fields(owner = %user.id, address_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    AddressRepository::new(state.pool())
        .delete(id, user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Make an address the default.
#[instrument(skip(state, user), fields(owner = %user.id, address_id = %id))]
pub async fn set_default(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    AddressRepository::new(state.pool())
        .set_default(id, user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
