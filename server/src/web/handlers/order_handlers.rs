// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::cancel_item_pipeline;
use crate::pipelines::contexts::CancelItemCtxData;
use crate::services::auth_service::{self, Caller};
use crate::state::AppState;
use crate::web::dto::{CancelItemRequest, CancelItemResponse, OrderWithItems};
use crate::web::extractors::AuthenticatedCaller;

#[instrument(
    name = "handler::cancel_item",
    skip(app_state, req_payload, caller),
    fields(order_item_id = %req_payload.order_item_id, cancelled_quantity = req_payload.cancelled_quantity, caller = caller.0.kind())
)]
pub async fn cancel_item_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedCaller,
  req_payload: web::Json<CancelItemRequest>,
) -> Result<HttpResponse, AppError> {
  let CancelItemRequest {
    order_item_id,
    cancelled_quantity,
  } = req_payload.into_inner();

  let ctx_data = CancelItemCtxData::new(app_state.get_ref().clone(), caller.0, order_item_id, cancelled_quantity);
  match cancel_item_pipeline::cancel_order_item(ctx_data).await {
    Ok(outcome) => {
      info!(
        "Cancelled {} unit(s) of item {}. Order {} total is now {}.",
        cancelled_quantity, order_item_id, outcome.order.id, outcome.order.total_amount
      );
      Ok(HttpResponse::Ok().json(CancelItemResponse::from_outcome(outcome, cancelled_quantity)))
    }
    Err(app_err) => {
      warn!("Cancel item request for {} failed: {}", order_item_id, app_err);
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::list_orders", skip(app_state, caller))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedCaller,
) -> Result<HttpResponse, AppError> {
  let user_id = caller
    .0
    .user_id()
    .ok_or_else(|| AppError::Validation("Order listing requires a user token".to_string()))?;
  let orders = app_state.store.list_orders_for_user(user_id).await?;
  info!("Fetched {} orders for user {}.", orders.len(), user_id);
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::get_order", skip(app_state, path, caller), fields(order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedCaller,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order = load_visible_order(&app_state, &caller.0, order_id).await?;
  let order_items = app_state.store.list_order_item_details(order_id).await?;
  Ok(HttpResponse::Ok().json(OrderWithItems { order, order_items }))
}

/// Loads an order the caller may see.
pub(crate) async fn load_visible_order(
  app_state: &AppState,
  caller: &Caller,
  order_id: Uuid,
) -> Result<crate::models::Order, AppError> {
  let order = app_state
    .store
    .find_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  auth_service::authorize_order_access(caller, &order)?;
  Ok(order)
}
