pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use application::checkout::CheckoutService;
use application::order_payment_service::OrderPaymentService;
use application::order_service::OrderService;
use domain::ports::{HttpClient, OrderRepository};
use infrastructure::order_payment_gateway::HttpOrderPaymentGateway;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

/// Wires the order repository and the payment-service client into the
/// checkout orchestrator.
pub fn build_checkout_service(
    repo: Arc<dyn OrderRepository>,
    client: Arc<dyn HttpClient>,
) -> CheckoutService {
    let gateway = HttpOrderPaymentGateway::new(client);
    CheckoutService::new(
        OrderService::new(repo),
        OrderPaymentService::new(Arc::new(gateway)),
    )
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    service: CheckoutService,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let service = web::Data::new(service);
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(Logger::default())
            .configure(handlers::routes)
    })
    .bind((host.to_string(), port))?
    .run())
}
