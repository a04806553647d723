//! Shopping cart endpoints.
//!
//! Cart listings price against the current catalog on every read; nothing
//! here is snapshotted. Line mutations check existence before ownership so a
//! missing line and a foreign line stay distinguishable.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::{CartLine, CartLineView};
use crate::error::{BookstoreError, Result};
use crate::AppState;

// -- Request types --

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub book_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetQuantityRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

// -- Handlers --

/// GET /api/v1/cart/:user_id. The user's lines with live prices and totals.
pub async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<CartLineView>>> {
    state
        .store
        .user_by_id(user_id)
        .await?
        .ok_or(BookstoreError::NotFound("user"))?;
    Ok(Json(state.store.cart_for_user(user_id).await?))
}

/// POST /api/v1/cart/:user_id. Adds a book, merging into an existing line
/// for the same book by summing quantities.
pub async fn add(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartLine>)> {
    req.validate()?;
    state
        .store
        .user_by_id(user_id)
        .await?
        .ok_or(BookstoreError::NotFound("user"))?;
    state
        .store
        .book_by_id(req.book_id)
        .await?
        .ok_or(BookstoreError::NotFound("book"))?;
    let line = state
        .store
        .upsert_cart_line(user_id, req.book_id, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(line)))
}

/// PUT /api/v1/cart/:user_id/:line_id. Replaces a line's quantity.
pub async fn set_quantity(
    State(state): State<AppState>,
    Path((user_id, line_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SetQuantityRequest>,
) -> Result<Json<CartLine>> {
    req.validate()?;
    let line = state
        .store
        .cart_line_by_id(line_id)
        .await?
        .ok_or(BookstoreError::NotFound("cart line"))?;
    if line.user_id != user_id {
        return Err(BookstoreError::Forbidden("cart line"));
    }
    let line = state
        .store
        .set_cart_line_quantity(line_id, req.quantity)
        .await?;
    Ok(Json(line))
}

/// DELETE /api/v1/cart/:user_id/:line_id
pub async fn remove(
    State(state): State<AppState>,
    Path((user_id, line_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    let line = state
        .store
        .cart_line_by_id(line_id)
        .await?
        .ok_or(BookstoreError::NotFound("cart line"))?;
    if line.user_id != user_id {
        return Err(BookstoreError::Forbidden("cart line"));
    }
    state.store.delete_cart_line(line_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/cart/:user_id. Drops every line; a no-op on an empty cart.
pub async fn clear(State(state): State<AppState>, Path(user_id): Path<Uuid>) -> Result<StatusCode> {
    state.store.clear_cart(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
