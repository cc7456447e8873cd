use std::io;
use std::sync::Arc;

use dotenvy::dotenv;
use fastfood_order::config::{Config, StorageEngine};
use fastfood_order::domain::ports::OrderRepository;
use fastfood_order::infrastructure::circuit_breaker::CircuitBreaker;
use fastfood_order::infrastructure::http_client::{ReqwestClient, ResilientClient};
use fastfood_order::infrastructure::memory_order_repo::InMemoryOrderRepository;
use fastfood_order::infrastructure::order_repo::DieselOrderRepository;
use fastfood_order::{build_checkout_service, build_server, create_pool, run_migrations};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(io::Error::other)?;

    let repo: Arc<dyn OrderRepository> = match config.storage {
        StorageEngine::Postgres => {
            let pool = create_pool(&config.database_url).map_err(io::Error::other)?;
            run_migrations(&pool).map_err(io::Error::other)?;
            Arc::new(DieselOrderRepository::new(pool))
        }
        StorageEngine::Memory => {
            log::warn!("ORDER_STORAGE=memory: orders are lost on restart");
            Arc::new(InMemoryOrderRepository::new())
        }
    };

    // One breaker per downstream service, shared by every request.
    let breaker = Arc::new(CircuitBreaker::new(
        "payment-service",
        config.circuit_breaker.clone(),
    ));
    let payment_client = ReqwestClient::new(&config.payment_service_url, config.http_timeout)
        .map_err(io::Error::other)?;
    let client = Arc::new(ResilientClient::new(payment_client, breaker));

    let service = build_checkout_service(repo, client);

    log::info!(
        "Starting server at http://{}:{} (payments at {})",
        config.host,
        config.port,
        config.payment_service_url
    );

    build_server(service, &config.host, config.port)?.await
}
