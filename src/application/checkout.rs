use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderInput};

use super::order_payment_service::OrderPaymentService;
use super::order_service::OrderService;

/// What a successful checkout exposes to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutResult {
    pub id: i32,
}

/// Entry point for the order endpoints: checkout plus the plain order
/// operations.
///
/// Checkout is two steps with no compensation. Once the order is stored it
/// stays stored, even if the payment notification that follows fails.
#[derive(Clone)]
pub struct CheckoutService {
    orders: OrderService,
    payments: OrderPaymentService,
}

impl CheckoutService {
    pub fn new(orders: OrderService, payments: OrderPaymentService) -> Self {
        Self { orders, payments }
    }

    pub async fn checkout(&self, input: OrderInput) -> Result<CheckoutResult, DomainError> {
        let order = self.orders.create(input).await?;

        if let Err(e) = self.payments.create(&order).await {
            log::warn!(
                "order {} stored but payment notification failed: {}",
                order.id,
                e
            );
            return Err(DomainError::Downstream(e));
        }

        log::info!("order {} checked out", order.id);
        Ok(CheckoutResult { id: order.id })
    }

    pub async fn get_all(&self) -> Result<Vec<Order>, DomainError> {
        self.orders.get_all().await
    }

    pub async fn update_status(&self, id: i32, status: &str) -> Result<Order, DomainError> {
        self.orders.update_status(id, status).await
    }
}
