//! Checkout and order history endpoints.

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::checkout::PaymentMethod;
use crate::domain::events::{publish_order_confirmed, OrderConfirmed};
use crate::domain::models::{Order, OrderStatus, OrderView};
use crate::error::{BookstoreError, Result};
use crate::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: String,
    pub payment_method: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub status: OrderStatus,
    pub order_id: Uuid,
    pub total_amount: Decimal,
    pub payment_provider: &'static str,
    pub payment_reference: String,
}

// -- Handlers --

/// POST /api/v1/orders/:id/checkout. Converts the user's whole cart into a
/// confirmed order. The storage transaction snapshots prices, writes the
/// order and clears the cart as one unit; payment is classified and mocked
/// afterwards.
#[tracing::instrument(skip(state, req))]
pub async fn checkout(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    state
        .store
        .user_by_id(user_id)
        .await?
        .ok_or(BookstoreError::NotFound("user"))?;

    let order = state
        .store
        .place_order(user_id, &req.shipping_address)
        .await?;

    let method = PaymentMethod::classify(req.payment_method.as_deref());
    let response = CheckoutResponse {
        status: order.status,
        order_id: order.id,
        total_amount: order.total_amount,
        payment_provider: method.provider(),
        payment_reference: method.issue_reference(),
    };

    // The order is committed at this point; event delivery is best effort.
    if let Some(nats) = &state.nats {
        let event = OrderConfirmed {
            order_id: order.id,
            user_id,
            total_amount: order.total_amount,
        };
        publish_order_confirmed(nats, &event).await;
    }

    tracing::info!(order_id = %order.id, total = %order.total_amount, "checkout confirmed");
    Ok(Json(response))
}

/// GET /api/v1/orders/:id. One order with its snapshot lines.
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<OrderView>> {
    let order = state
        .store
        .order_by_id(id)
        .await?
        .ok_or(BookstoreError::NotFound("order"))?;
    let lines = state.store.lines_for_order(id).await?;
    Ok(Json(OrderView { order, lines }))
}

/// GET /api/v1/orders/user/:user_id. The user's orders, newest first.
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Order>>> {
    state
        .store
        .user_by_id(user_id)
        .await?
        .ok_or(BookstoreError::NotFound("user"))?;
    Ok(Json(state.store.orders_for_user(user_id).await?))
}
