use serde::{Deserialize, Serialize};

use super::order::Order;

// New orders are announced as waiting for payment; a zero status is never sent.
pub const PAYMENT_STATUS_WAITING: i32 = 1;

/// Notification sent to the payment service once an order is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPayment {
    #[serde(rename = "id")]
    pub order_id: i32,
    pub payment_status_id: i32,
}

impl OrderPayment {
    pub fn for_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            payment_status_id: PAYMENT_STATUS_WAITING,
        }
    }
}
