// server/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::contexts::OrderStatusCtxData;
use crate::pipelines::order_status_pipeline;
use crate::services::auth_service;
use crate::state::AppState;
use crate::web::dto::{ReviewReturnRequest, UpdateOrderStatusRequest, UpdateOrderStatusResponse};
use crate::web::extractors::AuthenticatedCaller;

#[instrument(
    name = "handler::update_order_status",
    skip(app_state, path, req_payload, caller),
    fields(order_id = %path.as_ref(), status = %req_payload.status)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedCaller,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = OrderStatusCtxData::new(
    app_state.get_ref().clone(),
    caller.0,
    path.into_inner(),
    req_payload.status,
  );
  let (order, changed) = order_status_pipeline::update_order_status(ctx_data).await?;
  Ok(HttpResponse::Ok().json(UpdateOrderStatusResponse { order, changed }))
}

#[instrument(
    name = "handler::review_return_request",
    skip(app_state, path, req_payload, caller),
    fields(return_id = %path.as_ref())
)]
pub async fn review_return_request_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedCaller,
  path: web::Path<Uuid>,
  req_payload: web::Json<ReviewReturnRequest>,
) -> Result<HttpResponse, AppError> {
  auth_service::require_admin(&caller.0)?;
  let reviewed = app_state
    .store
    .review_return_request(path.into_inner(), req_payload.status, Utc::now())
    .await?;
  info!("Return request {} marked {:?}.", reviewed.id, reviewed.status);
  Ok(HttpResponse::Ok().json(reviewed))
}
