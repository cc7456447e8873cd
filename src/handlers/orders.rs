use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::checkout::CheckoutService;
use crate::domain::order::{Order, OrderInput, OrderItemInput};
use crate::errors::AppError;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct OrderItemRequest {
    /// Menu item id.
    pub id: i32,
    pub quantity: i32,
}

/// Missing fields default to zero/empty so validation can report them.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CheckoutRequest {
    pub customer_id: i32,
    pub items: Vec<OrderItemRequest>,
}

impl From<CheckoutRequest> for OrderInput {
    fn from(req: CheckoutRequest) -> Self {
        OrderInput {
            customer_id: req.customer_id,
            items: req
                .items
                .into_iter()
                .map(|i| OrderItemInput {
                    id: i.id,
                    quantity: i.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub id: i32,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct OrderStatusRequest {
    /// One of RECEIVED, IN_PREPARATION, READY, DONE.
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub item_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: i32,
    pub customer_id: i32,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        OrderResponse {
            id: o.id,
            customer_id: o.customer_id,
            status: o.status,
            items: o
                .items
                .into_iter()
                .map(|i| OrderItemResponse {
                    item_id: i.item_id,
                    quantity: i.quantity,
                })
                .collect(),
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /v1/orders
///
/// Lists orders for the kitchen display: READY first, then IN_PREPARATION,
/// then RECEIVED, then anything else; oldest first within a status.
#[utoipa::path(
    get,
    path = "/v1/orders",
    responses(
        (status = 200, description = "Orders in kitchen-queue order", body = [OrderResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(service: web::Data<CheckoutService>) -> Result<HttpResponse, AppError> {
    let orders = service.get_all().await?;

    let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /v1/orders/checkout
///
/// Stores a new order and notifies the payment service. If the notification
/// fails the order is still stored and the call answers 502.
#[utoipa::path(
    post,
    path = "/v1/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order created and payment notified", body = CheckoutResponse),
        (status = 400, description = "Invalid order"),
        (status = 500, description = "Internal server error"),
        (status = 502, description = "Payment service unavailable"),
    ),
    tag = "orders"
)]
pub async fn checkout(
    service: web::Data<CheckoutService>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let result = service.checkout(body.into_inner().into()).await?;

    Ok(HttpResponse::Ok().json(CheckoutResponse { id: result.id }))
}

/// PATCH /v1/orders/{id}
#[utoipa::path(
    patch,
    path = "/v1/orders/{id}",
    params(
        ("id" = i32, Path, description = "Order id"),
    ),
    request_body = OrderStatusRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn update_status(
    service: web::Data<CheckoutService>,
    path: web::Path<i32>,
    body: web::Json<OrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order = service
        .update_status(path.into_inner(), &body.status)
        .await?;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
