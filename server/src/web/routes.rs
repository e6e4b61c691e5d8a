// server/src/web/routes.rs

use actix_web::http::Method;
use actix_web::middleware::DefaultHeaders;
use actix_web::{error, web, HttpRequest, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{admin_handlers, edge_handlers, order_handlers, product_handlers, return_handlers};

pub const CORS_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const CORS_ALLOW_METHODS: &str = "POST, OPTIONS";

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(format!("Invalid request body: {}", err)).into()
}

fn path_error_handler(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(format!("Invalid path parameter: {}", err)).into()
}

fn cors_headers() -> DefaultHeaders {
  DefaultHeaders::new()
    .add(("Access-Control-Allow-Origin", "*"))
    .add(("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS))
    .add(("Access-Control-Allow-Methods", CORS_ALLOW_METHODS))
}

/// Registers every route. Expects `web::Data<AppState>` on the app.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(json_error_handler))
    .app_data(web::PathConfig::default().error_handler(path_error_handler))
    .service(
      web::scope("/api/v1")
        .route("/health", web::get().to(health_check_handler))
        .service(
          web::scope("/products")
            .route("", web::get().to(product_handlers::list_products_handler))
            .route("/{product_id}", web::get().to(product_handlers::get_product_handler)),
        )
        .service(
          web::scope("/orders")
            .route("", web::get().to(order_handlers::list_orders_handler))
            .route("/cancel-item", web::post().to(order_handlers::cancel_item_handler))
            .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
            .route(
              "/{order_id}/returns",
              web::post().to(return_handlers::create_return_request_handler),
            )
            .route(
              "/{order_id}/returns",
              web::get().to(return_handlers::list_return_requests_handler),
            ),
        )
        .service(
          web::scope("/admin")
            .route(
              "/orders/{order_id}/status",
              web::patch().to(admin_handlers::update_order_status_handler),
            )
            .route(
              "/returns/{return_id}",
              web::patch().to(admin_handlers::review_return_request_handler),
            ),
        ),
    )
    .service(
      web::scope("/functions/v1").wrap(cors_headers()).service(
        web::resource("/cancel-order-item")
          .route(web::post().to(edge_handlers::cancel_order_item_function))
          .route(web::method(Method::OPTIONS).to(edge_handlers::preflight_handler)),
      ),
    );
}
