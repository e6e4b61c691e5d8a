// server/src/pipelines/cancel_item_pipeline.rs

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderItem, OrderItemDetail};
use crate::pipelines::contexts::CancelItemCtxData;
use crate::services::{auth_service, cancellation};
use crate::store::CancellationCommit;
use storefront_flow::{skip_when, Flow, FlowContext, FlowOutcome, FlowRegistry, StepControl};
use tracing::{info, warn};

pub const FLOW_NAME: &str = "cancel_order_item";

/// Result of a committed cancellation as returned to clients.
#[derive(Debug, Clone)]
pub struct CancellationOutcome {
  pub order: Order,
  pub order_item: OrderItem,
  pub all_items_cancelled: bool,
  pub order_items: Option<Vec<OrderItemDetail>>,
}

pub fn build_cancel_item_flow() -> Flow<CancelItemCtxData, AppError> {
  let mut p = Flow::<CancelItemCtxData, AppError>::new(
    FLOW_NAME,
    &[
      ("validate_cancellation_request", false, None),
      ("load_order_item", false, None),
      ("load_parent_order", false, None),
      (
        "authorize_caller",
        false,
        skip_when(|d: &CancelItemCtxData| d.caller.is_trusted()),
      ),
      ("check_order_state", false, None),
      ("check_remaining_quantity", false, None),
      ("commit_cancellation", false, None),
      (
        "load_item_details",
        false,
        skip_when(|d: &CancelItemCtxData| !d.include_item_details),
      ),
    ],
  );

  p.on("validate_cancellation_request", |ctx: FlowContext<CancelItemCtxData>| {
    Box::pin(async move {
      let (item_id, quantity, caller) = {
        let guard = ctx.read();
        (guard.order_item_id, guard.cancelled_quantity, guard.caller)
      };
      info!(
        "Cancel Item Flow (Item {}): {} requested cancellation of {} unit(s).",
        item_id,
        caller.kind(),
        quantity
      );
      cancellation::ensure_positive_quantity(quantity)?;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("load_order_item", |ctx: FlowContext<CancelItemCtxData>| {
    Box::pin(async move {
      let (store, item_id) = {
        let guard = ctx.read();
        (guard.app_state.store.clone(), guard.order_item_id)
      };
      let item = store
        .find_order_item(item_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order item not found".to_string()))?;
      ctx.write().order_item = Some(item);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("load_parent_order", |ctx: FlowContext<CancelItemCtxData>| {
    Box::pin(async move {
      let (store, order_id) = {
        let guard = ctx.read();
        let item = loaded_item(&guard)?;
        (guard.app_state.store.clone(), item.order_id)
      };
      let order = store
        .find_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
      ctx.write().order = Some(order);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("authorize_caller", |ctx: FlowContext<CancelItemCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      let order = loaded_order(&guard)?;
      if let Err(err) = auth_service::authorize_order_access(&guard.caller, order) {
        warn!(
          "Cancel Item Flow (Item {}): caller does not own order {}.",
          guard.order_item_id, order.id
        );
        return Err(err);
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("check_order_state", |ctx: FlowContext<CancelItemCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      cancellation::ensure_cancellable(loaded_order(&guard)?)?;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("check_remaining_quantity", |ctx: FlowContext<CancelItemCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      cancellation::ensure_within_remaining(loaded_item(&guard)?, guard.cancelled_quantity)?;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("commit_cancellation", |ctx: FlowContext<CancelItemCtxData>| {
    Box::pin(async move {
      let (store, commit) = {
        let guard = ctx.read();
        let item = loaded_item(&guard)?;
        let commit = CancellationCommit {
          order_id: item.order_id,
          order_item_id: item.id,
          observed_cancelled_quantity: item.cancelled_quantity,
          quantity: guard.cancelled_quantity,
          restore_stock: guard.app_state.config.restore_stock_on_cancel,
          at: guard.requested_at,
        };
        (guard.app_state.store.clone(), commit)
      };

      let committed = store.commit_cancellation(&commit).await?;
      if committed.order_item.id != commit.order_item_id || committed.order.id != commit.order_id {
        return Err(AppError::Internal(
          "Cancellation committed against an unexpected record".to_string(),
        ));
      }
      ctx.write().committed = Some(committed);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.after("commit_cancellation", |ctx: FlowContext<CancelItemCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      if let Some(c) = &guard.committed {
        info!(
          "Cancel Item Flow (Item {}): committed. Order {} is now {} with total {}. All items cancelled: {}",
          c.order_item.id, c.order.id, c.order.status, c.order.total_amount, c.all_items_cancelled
        );
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("load_item_details", |ctx: FlowContext<CancelItemCtxData>| {
    Box::pin(async move {
      let (store, order_id) = {
        let guard = ctx.read();
        (guard.app_state.store.clone(), loaded_order(&guard)?.id)
      };
      let details = store.list_order_item_details(order_id).await?;
      ctx.write().item_details = Some(details);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p
}

fn loaded_item(data: &CancelItemCtxData) -> Result<&OrderItem> {
  data
    .order_item
    .as_ref()
    .ok_or_else(|| AppError::Internal("Order item was not loaded".to_string()))
}

fn loaded_order(data: &CancelItemCtxData) -> Result<&Order> {
  data
    .order
    .as_ref()
    .ok_or_else(|| AppError::Internal("Order was not loaded".to_string()))
}

pub fn register_cancel_item_pipeline(flows: &FlowRegistry<AppError>) {
  flows.register(build_cancel_item_flow());
}

/// Runs the cancellation workflow for `ctx_data`.
pub async fn cancel_order_item(ctx_data: CancelItemCtxData) -> Result<CancellationOutcome> {
  let flows = ctx_data.app_state.flows.clone();
  let ctx = FlowContext::new(ctx_data);

  match flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let mut guard = ctx.write();
      let committed = guard
        .committed
        .take()
        .ok_or_else(|| AppError::Internal("Cancellation finished without a commit".to_string()))?;
      Ok(CancellationOutcome {
        order: committed.order,
        order_item: committed.order_item,
        all_items_cancelled: committed.all_items_cancelled,
        order_items: guard.item_details.take(),
      })
    }
    FlowOutcome::Halted { step } => Err(AppError::Internal(format!(
      "Cancellation halted unexpectedly at '{}'",
      step
    ))),
  }
}
