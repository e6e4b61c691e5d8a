// server/src/web/handlers/edge_handlers.rs

//! Serverless-style function endpoint for browser clients. Bearer
//! authentication only; CORS headers are added by the enclosing scope.

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::pipelines::cancel_item_pipeline;
use crate::pipelines::contexts::CancelItemCtxData;
use crate::state::AppState;
use crate::web::dto::{CancelItemRequest, CancelItemResponse};
use crate::web::extractors::BearerCaller;

#[instrument(
    name = "handler::cancel_order_item_function",
    skip(app_state, req_payload, caller),
    fields(order_item_id = %req_payload.order_item_id, cancelled_quantity = req_payload.cancelled_quantity)
)]
pub async fn cancel_order_item_function(
  app_state: web::Data<AppState>,
  caller: BearerCaller,
  req_payload: web::Json<CancelItemRequest>,
) -> Result<HttpResponse, AppError> {
  let CancelItemRequest {
    order_item_id,
    cancelled_quantity,
  } = req_payload.into_inner();

  let ctx_data = CancelItemCtxData::new(app_state.get_ref().clone(), caller.0, order_item_id, cancelled_quantity)
    .with_item_details();
  let outcome = cancel_item_pipeline::cancel_order_item(ctx_data).await?;
  info!(
    "Function cancelled {} unit(s) of item {} on order {}.",
    cancelled_quantity, order_item_id, outcome.order.id
  );
  Ok(HttpResponse::Ok().json(CancelItemResponse::from_outcome(outcome, cancelled_quantity)))
}

pub async fn preflight_handler() -> HttpResponse {
  HttpResponse::Ok().content_type("text/plain").body("ok")
}
