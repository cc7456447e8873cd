use std::sync::Arc;

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderInput};
use crate::domain::ports::{OrderRepository, RepositoryError};

const GET_FAILED: &str = "get order from repository has failed";
const CREATE_FAILED: &str = "create order on repository has failed";
const UPDATE_FAILED: &str = "update order on repository has failed";

fn repository_failure(message: &'static str, source: RepositoryError) -> DomainError {
    log::error!("{}: {}", message, source);
    DomainError::Repository { message, source }
}

#[derive(Clone)]
pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_all(&self) -> Result<Vec<Order>, DomainError> {
        self.repo
            .get_all()
            .await
            .map_err(|e| repository_failure(GET_FAILED, e))
    }

    /// Validates the cart and stores a new `RECEIVED` order.
    ///
    /// Nothing reaches the repository when validation fails.
    pub async fn create(&self, input: OrderInput) -> Result<Order, DomainError> {
        let order = Order::new(input)?;

        self.repo
            .create(order)
            .await
            .map_err(|e| repository_failure(CREATE_FAILED, e))
    }

    /// Moves an order to `status`. Any known status is accepted from any
    /// other; concurrent updates to the same order are last-write-wins.
    pub async fn update_status(&self, id: i32, status: &str) -> Result<Order, DomainError> {
        let mut order = match self.repo.get_by_id(id).await {
            Ok(order) => order,
            Err(RepositoryError::NotFound) => return Err(DomainError::NotFound),
            Err(e) => return Err(repository_failure(GET_FAILED, e)),
        };

        order.set_status(status);
        order.validate()?;

        match self.repo.update(id, order).await {
            Ok(order) => Ok(order),
            Err(RepositoryError::NotFound) => Err(DomainError::NotFound),
            Err(e) => Err(repository_failure(UPDATE_FAILED, e)),
        }
    }
}
