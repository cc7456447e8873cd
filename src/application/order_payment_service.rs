use std::sync::Arc;

use crate::domain::order::Order;
use crate::domain::payment::OrderPayment;
use crate::domain::ports::{HttpClientError, OrderPaymentRepository};

#[derive(Clone)]
pub struct OrderPaymentService {
    gateway: Arc<dyn OrderPaymentRepository>,
}

impl OrderPaymentService {
    pub fn new(gateway: Arc<dyn OrderPaymentRepository>) -> Self {
        Self { gateway }
    }

    /// Notifies the payment service about a stored order. Gateway errors are
    /// returned as they are.
    pub async fn create(&self, order: &Order) -> Result<(), HttpClientError> {
        self.gateway.create(OrderPayment::for_order(order)).await
    }
}
