// server/src/pipelines/return_request_pipeline.rs

use crate::errors::{AppError, Result};
use crate::models::{Order, ReturnRequest};
use crate::pipelines::contexts::ReturnRequestCtxData;
use crate::services::{auth_service, returns};
use crate::store::NewReturnRequest;
use storefront_flow::{skip_when, Flow, FlowContext, FlowOutcome, FlowRegistry, StepControl};
use tracing::info;

pub fn build_return_request_flow() -> Flow<ReturnRequestCtxData, AppError> {
  let mut p = Flow::<ReturnRequestCtxData, AppError>::new(
    "create_return_request",
    &[
      ("validate_return_request", false, None),
      ("load_order", false, None),
      (
        "authorize_caller",
        false,
        skip_when(|d: &ReturnRequestCtxData| d.caller.is_trusted()),
      ),
      ("check_order_returnable", false, None),
      ("persist_return_request", false, None),
    ],
  );

  p.on("validate_return_request", |ctx: FlowContext<ReturnRequestCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      if guard.quantity <= 0 {
        return Err(AppError::Validation("quantity must be a positive integer".to_string()));
      }
      guard.reason = returns::validate_reason(&guard.reason)?;
      info!(
        "Return Request Flow (Order {}): {} unit(s) of item {} requested.",
        guard.order_id, guard.quantity, guard.order_item_id
      );
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("load_order", |ctx: FlowContext<ReturnRequestCtxData>| {
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

  p.on("authorize_caller", |ctx: FlowContext<ReturnRequestCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      auth_service::authorize_order_access(&guard.caller, loaded_order(&guard)?)?;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("check_order_returnable", |ctx: FlowContext<ReturnRequestCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      returns::ensure_returnable_order(loaded_order(&guard)?)?;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("persist_return_request", |ctx: FlowContext<ReturnRequestCtxData>| {
    Box::pin(async move {
      let (store, request) = {
        let guard = ctx.read();
        let order = loaded_order(&guard)?;
        let request = NewReturnRequest {
          order_id: order.id,
          order_item_id: guard.order_item_id,
          // Requests filed by staff are recorded against the order's owner.
          user_id: order.user_id,
          quantity: guard.quantity,
          reason: guard.reason.clone(),
          at: guard.requested_at,
        };
        (guard.app_state.store.clone(), request)
      };
      let created = store.create_return_request(&request).await?;
      info!(
        "Return Request Flow (Order {}): created return request {}.",
        created.order_id, created.id
      );
      ctx.write().created = Some(created);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p
}

fn loaded_order(data: &ReturnRequestCtxData) -> Result<&Order> {
  data
    .order
    .as_ref()
    .ok_or_else(|| AppError::Internal("Order was not loaded".to_string()))
}

pub fn register_return_request_pipeline(flows: &FlowRegistry<AppError>) {
  flows.register(build_return_request_flow());
}

pub async fn create_return_request(ctx_data: ReturnRequestCtxData) -> Result<ReturnRequest> {
  let flows = ctx_data.app_state.flows.clone();
  let ctx = FlowContext::new(ctx_data);

  match flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => ctx
      .write()
      .created
      .take()
      .ok_or_else(|| AppError::Internal("Return request flow finished without a record".to_string())),
    FlowOutcome::Halted { step } => Err(AppError::Internal(format!(
      "Return request flow halted unexpectedly at '{}'",
      step
    ))),
  }
}
