//! Domain events published after checkout commits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ORDER_CONFIRMED_SUBJECT: &str = "bookstore.orders.confirmed";

/// Emitted once per successful checkout, after the transaction commits.
/// Delivery is best effort; the order is already durable when this fires.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub total_amount: Decimal,
}

pub async fn publish_order_confirmed(client: &async_nats::Client, event: &OrderConfirmed) {
    let payload = match serde_json::to_vec(event) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "failed to encode order event");
            return;
        }
    };
    if let Err(err) = client
        .publish(ORDER_CONFIRMED_SUBJECT.to_string(), payload.into())
        .await
    {
        tracing::warn!(error = %err, order_id = %event.order_id, "failed to publish order event");
    }
}
