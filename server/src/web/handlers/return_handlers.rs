// server/src/web/handlers/return_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::contexts::ReturnRequestCtxData;
use crate::pipelines::return_request_pipeline;
use crate::state::AppState;
use crate::web::dto::CreateReturnRequest;
use crate::web::extractors::AuthenticatedCaller;

use super::order_handlers::load_visible_order;

#[instrument(
    name = "handler::create_return_request",
    skip(app_state, path, req_payload, caller),
    fields(order_id = %path.as_ref(), order_item_id = %req_payload.order_item_id)
)]
pub async fn create_return_request_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedCaller,
  path: web::Path<Uuid>,
  req_payload: web::Json<CreateReturnRequest>,
) -> Result<HttpResponse, AppError> {
  let CreateReturnRequest {
    order_item_id,
    quantity,
    reason,
  } = req_payload.into_inner();

  let ctx_data = ReturnRequestCtxData::new(
    app_state.get_ref().clone(),
    caller.0,
    path.into_inner(),
    order_item_id,
    quantity,
    reason,
  );
  let created = return_request_pipeline::create_return_request(ctx_data).await?;
  info!("Return request {} created.", created.id);
  Ok(HttpResponse::Created().json(created))
}

#[instrument(name = "handler::list_return_requests", skip(app_state, path, caller), fields(order_id = %path.as_ref()))]
pub async fn list_return_requests_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedCaller,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = load_visible_order(&app_state, &caller.0, path.into_inner()).await?;
  let requests = app_state.store.list_return_requests(order.id).await?;
  Ok(HttpResponse::Ok().json(requests))
}
