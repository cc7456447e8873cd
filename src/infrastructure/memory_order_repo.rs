//! In-memory order storage, for local runs without Postgres and for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::order::{kitchen_queue_order, Order};
use crate::domain::ports::{OrderRepository, RepositoryError};

#[derive(Default)]
struct Store {
    next_id: i32,
    orders: HashMap<i32, Order>,
}

/// Orders live in a map behind a read-write lock; ids start at 1.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    store: RwLock<Store>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn get_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let store = self.store.read().await;
        let mut orders: Vec<Order> = store.orders.values().cloned().collect();
        kitchen_queue_order(&mut orders);
        Ok(orders)
    }

    async fn get_by_id(&self, id: i32) -> Result<Order, RepositoryError> {
        let store = self.store.read().await;
        store
            .orders
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn create(&self, mut order: Order) -> Result<Order, RepositoryError> {
        let mut store = self.store.write().await;
        store.next_id += 1;

        let now = Utc::now();
        order.id = store.next_id;
        order.created_at = now;
        order.updated_at = now;

        store.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn update(&self, id: i32, order: Order) -> Result<Order, RepositoryError> {
        let mut store = self.store.write().await;
        let stored = store.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        stored.status = order.status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}
