use async_trait::async_trait;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::Integer;

use crate::db::DbPool;
use crate::domain::order::Order;
use crate::domain::ports::{OrderRepository, RepositoryError};
use crate::schema::{order_items, orders};

use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for RepositoryError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => RepositoryError::NotFound,
            e => RepositoryError::Persistence(e.to_string()),
        }
    }
}

impl From<r2d2::Error> for RepositoryError {
    fn from(e: r2d2::Error) -> Self {
        RepositoryError::Persistence(e.to_string())
    }
}

impl From<tokio::task::JoinError> for RepositoryError {
    fn from(e: tokio::task::JoinError) -> Self {
        RepositoryError::Persistence(e.to_string())
    }
}

// Kitchen display order; mirrors `domain::order::kitchen_priority`.
const KITCHEN_PRIORITY: &str = "CASE orders.status \
     WHEN 'READY' THEN 1 \
     WHEN 'IN_PREPARATION' THEN 2 \
     WHEN 'RECEIVED' THEN 3 \
     ELSE 4 END";

// ── Repository ────────────────────────────────────────────────────────────────

/// Postgres-backed orders. Diesel is blocking, so every call runs on the
/// blocking thread pool.
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, RepositoryError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }
}

fn load_items(conn: &mut PgConnection, row: &OrderRow) -> QueryResult<Vec<OrderItemRow>> {
    OrderItemRow::belonging_to(row)
        .select(OrderItemRow::as_select())
        .order(order_items::id.asc())
        .load(conn)
}

#[async_trait]
impl OrderRepository for DieselOrderRepository {
    async fn get_all(&self) -> Result<Vec<Order>, RepositoryError> {
        self.run(|conn| {
            let rows = orders::table
                .select(OrderRow::as_select())
                .order(sql::<Integer>(KITCHEN_PRIORITY))
                .then_order_by(orders::created_at.asc())
                .then_order_by(orders::id.asc())
                .load(conn)?;

            let items = OrderItemRow::belonging_to(&rows)
                .select(OrderItemRow::as_select())
                .order(order_items::id.asc())
                .load(conn)?;

            Ok(items
                .grouped_by(&rows)
                .into_iter()
                .zip(rows)
                .map(|(items, row)| row.into_order(items))
                .collect())
        })
        .await
    }

    async fn get_by_id(&self, id: i32) -> Result<Order, RepositoryError> {
        self.run(move |conn| {
            let row = orders::table
                .find(id)
                .select(OrderRow::as_select())
                .first(conn)?;
            let items = load_items(conn, &row)?;
            Ok(row.into_order(items))
        })
        .await
    }

    async fn create(&self, order: Order) -> Result<Order, RepositoryError> {
        self.run(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|conn| {
                let row = diesel::insert_into(orders::table)
                    .values(&NewOrderRow {
                        customer_id: order.customer_id,
                        status: &order.status,
                    })
                    .returning(OrderRow::as_returning())
                    .get_result(conn)?;

                let new_items: Vec<NewOrderItemRow> = order
                    .items
                    .iter()
                    .map(|i| NewOrderItemRow {
                        order_id: row.id,
                        item_id: i.item_id,
                        quantity: i.quantity,
                    })
                    .collect();
                let items = diesel::insert_into(order_items::table)
                    .values(&new_items)
                    .returning(OrderItemRow::as_returning())
                    .get_results(conn)?;

                Ok(row.into_order(items))
            })
        })
        .await
    }

    async fn update(&self, id: i32, order: Order) -> Result<Order, RepositoryError> {
        self.run(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|conn| {
                let row = diesel::update(orders::table.find(id))
                    .set((
                        orders::status.eq(order.status.as_str()),
                        orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(OrderRow::as_returning())
                    .get_result(conn)?;
                let items = load_items(conn, &row)?;
                Ok(row.into_order(items))
            })
        })
        .await
    }
}
