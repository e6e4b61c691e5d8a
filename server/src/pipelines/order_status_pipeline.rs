// server/src/pipelines/order_status_pipeline.rs

use crate::errors::{AppError, Result};
use crate::models::Order;
use crate::pipelines::contexts::OrderStatusCtxData;
use crate::services::auth_service;
use crate::store::StatusTransition;
use storefront_flow::{Flow, FlowContext, FlowRegistry, StepControl};
use tracing::info;

pub fn build_order_status_flow() -> Flow<OrderStatusCtxData, AppError> {
  let mut p = Flow::<OrderStatusCtxData, AppError>::new(
    "update_order_status",
    &[
      ("authorize_admin", false, None),
      ("load_order", false, None),
      ("check_transition", false, None),
      ("persist_transition", false, None),
    ],
  );

  p.on("authorize_admin", |ctx: FlowContext<OrderStatusCtxData>| {
    Box::pin(async move {
      auth_service::require_admin(&ctx.read().caller)?;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("load_order", |ctx: FlowContext<OrderStatusCtxData>| {
    Box::pin(async move {
      let (store, order_id) = {
        let guard = ctx.read();
        (guard.app_state.store.clone(), guard.order_id)
      };
      let order = store
        .find_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
      ctx.write().order = Some(order);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("check_transition", |ctx: FlowContext<OrderStatusCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      let order = loaded_order(&guard)?;
      let next = guard.requested_status;
      if order.status == next {
        info!("Order Status Flow (Order {}): already {}, nothing to do.", order.id, next);
        return Ok(StepControl::Halt);
      }
      if !order.status.can_transition_to(next) {
        return Err(AppError::InvalidState(format!(
          "Cannot move order from '{}' to '{}'",
          order.status, next
        )));
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("persist_transition", |ctx: FlowContext<OrderStatusCtxData>| {
    Box::pin(async move {
      let (store, transition) = {
        let guard = ctx.read();
        let order = loaded_order(&guard)?;
        let transition = StatusTransition {
          order_id: order.id,
          from: order.status,
          to: guard.requested_status,
          at: guard.requested_at,
        };
        (guard.app_state.store.clone(), transition)
      };
      let updated = store.transition_order_status(&transition).await?;
      info!(
        "Order Status Flow (Order {}): {} -> {}.",
        updated.id, transition.from, updated.status
      );
      let mut guard = ctx.write();
      guard.order = Some(updated);
      guard.changed = true;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p
}

fn loaded_order(data: &OrderStatusCtxData) -> Result<&Order> {
  data
    .order
    .as_ref()
    .ok_or_else(|| AppError::Internal("Order was not loaded".to_string()))
}

pub fn register_order_status_pipeline(flows: &FlowRegistry<AppError>) {
  flows.register(build_order_status_flow());
}

/// Applies an administrative status change. Returns the order and whether
/// its status actually changed.
pub async fn update_order_status(ctx_data: OrderStatusCtxData) -> Result<(Order, bool)> {
  let flows = ctx_data.app_state.flows.clone();
  let ctx = FlowContext::new(ctx_data);

  // A halt means the order already had the requested status.
  flows.run(ctx.clone()).await?;

  let mut guard = ctx.write();
  let order = guard
    .order
    .take()
    .ok_or_else(|| AppError::Internal("Order status flow finished without an order".to_string()))?;
  Ok((order, guard.changed))
}
