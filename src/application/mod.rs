pub mod checkout;
pub mod order_payment_service;
pub mod order_service;
