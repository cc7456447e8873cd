use async_trait::async_trait;
use thiserror::Error;

use super::order::Order;
use super::payment::OrderPayment;

/// Failures reported by an order storage engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("persistence failure: {0}")]
    Persistence(String),
}

/// Failures of an outbound HTTP call, including circuit breaker rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpClientError {
    #[error("circuit breaker is open")]
    CircuitOpen,
    #[error("too many requests while circuit breaker is half-open")]
    TooManyRequests,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    /// All orders in kitchen-queue order.
    async fn get_all(&self) -> Result<Vec<Order>, RepositoryError>;
    async fn get_by_id(&self, id: i32) -> Result<Order, RepositoryError>;
    /// Stores the order and its items atomically and returns it with the
    /// assigned id and timestamps.
    async fn create(&self, order: Order) -> Result<Order, RepositoryError>;
    async fn update(&self, id: i32, order: Order) -> Result<Order, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderPaymentRepository: Send + Sync + 'static {
    async fn create(&self, payment: OrderPayment) -> Result<(), HttpClientError>;
}

/// Minimal outbound HTTP capability: a JSON `POST` returning the raw body.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    async fn post(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpClientError>;
}
