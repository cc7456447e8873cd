use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::payment::OrderPayment;
use crate::domain::ports::{HttpClient, HttpClientError, OrderPaymentRepository};

pub const ORDER_PAYMENT_PATH: &str = "/order-payment";

pub struct HttpOrderPaymentGateway {
    client: Arc<dyn HttpClient>,
}

impl HttpOrderPaymentGateway {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OrderPaymentRepository for HttpOrderPaymentGateway {
    async fn create(&self, payment: OrderPayment) -> Result<(), HttpClientError> {
        let body = serde_json::to_vec(&payment)
            .map_err(|e| HttpClientError::Serialization(e.to_string()))?;

        // The response body carries nothing the order side needs.
        self.client.post(ORDER_PAYMENT_PATH, body).await?;
        Ok(())
    }
}
