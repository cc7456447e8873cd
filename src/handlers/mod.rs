pub mod orders;

use actix_web::{web, HttpResponse};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::AppError;

#[derive(OpenApi)]
#[openapi(
    info(title = "Fastfood order service"),
    paths(alive, orders::list_orders, orders::checkout, orders::update_status),
    components(schemas(
        orders::CheckoutRequest,
        orders::CheckoutResponse,
        orders::OrderItemRequest,
        orders::OrderItemResponse,
        orders::OrderResponse,
        orders::OrderStatusRequest,
    )),
    tags((name = "orders", description = "Order checkout and kitchen queue"))
)]
pub struct ApiDoc;

/// GET /
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn alive() -> HttpResponse {
    HttpResponse::Ok().json("Alive")
}

/// Registers every route of the service. Malformed JSON bodies and path
/// parameters answer 400 with the same `{"error": ...}` body as other errors.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .route("/", web::get().to(alive))
    .service(
        web::scope("/v1/orders")
            .route("", web::get().to(orders::list_orders))
            .route("/checkout", web::post().to(orders::checkout))
            .route("/{id}", web::patch().to(orders::update_status)),
    )
    .service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
