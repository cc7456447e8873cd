pub mod circuit_breaker;
pub mod http_client;
pub mod memory_order_repo;
pub mod models;
pub mod order_payment_gateway;
pub mod order_repo;
