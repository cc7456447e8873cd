use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::errors::ValidationErrors;

/// Preparation states of an order, in the order the kitchen moves through them.
///
/// Any state may follow any other: `Order::validate` only checks membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Received,
    InPreparation,
    Ready,
    Done,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Received,
        OrderStatus::InPreparation,
        OrderStatus::Ready,
        OrderStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Received => "RECEIVED",
            OrderStatus::InPreparation => "IN_PREPARATION",
            OrderStatus::Ready => "READY",
            OrderStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Position of a status in the kitchen display: lower is shown first.
///
/// Orders nearer completion come first; statuses outside the enumeration
/// (and `DONE`) share the last slot.
pub fn kitchen_priority(status: &str) -> u8 {
    match status.parse::<OrderStatus>() {
        Ok(OrderStatus::Ready) => 1,
        Ok(OrderStatus::InPreparation) => 2,
        Ok(OrderStatus::Received) => 3,
        _ => 4,
    }
}

/// Kitchen-queue comparison: priority, then first come first served.
pub fn kitchen_queue_cmp(a: &Order, b: &Order) -> Ordering {
    kitchen_priority(&a.status)
        .cmp(&kitchen_priority(&b.status))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn kitchen_queue_order(orders: &mut [Order]) {
    orders.sort_by(kitchen_queue_cmp);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemInput {
    pub id: i32,
    pub quantity: i32,
}

/// Cart submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderInput {
    pub customer_id: i32,
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub item_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Assigned by the repository; `0` until the order is stored.
    pub id: i32,
    pub customer_id: i32,
    pub items: Vec<OrderItem>,
    /// Wire name of an [`OrderStatus`]. Kept as text so stored rows with a
    /// foreign status can still be listed.
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a `RECEIVED` order from a checkout cart.
    pub fn new(input: OrderInput) -> Result<Order, ValidationErrors> {
        let now = Utc::now();
        let order = Order {
            id: 0,
            customer_id: input.customer_id,
            items: input
                .items
                .into_iter()
                .map(|item| OrderItem {
                    item_id: item.id,
                    quantity: item.quantity,
                })
                .collect(),
            status: OrderStatus::Received.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };

        let mut errs = order.violations();
        for (i, item) in order.items.iter().enumerate() {
            if item.quantity <= 0 {
                errs.add(format!("items[{}].quantity", i), "must be greater than zero");
            }
        }
        errs.into_result()?;

        Ok(order)
    }

    /// Checks the invariants every stored order must hold, reporting all
    /// violated fields.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        self.violations().into_result()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    fn violations(&self) -> ValidationErrors {
        let mut errs = ValidationErrors::new();
        if self.customer_id <= 0 {
            errs.add("customer_id", "cannot be blank");
        }
        if self.items.is_empty() {
            errs.add("items", "cannot be blank");
        }
        if self.status.is_empty() {
            errs.add("status", "cannot be blank");
        } else if self.status.parse::<OrderStatus>().is_err() {
            errs.add("status", "must be a valid value");
        }
        errs
    }
}
