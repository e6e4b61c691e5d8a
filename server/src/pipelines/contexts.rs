// server/src/pipelines/contexts.rs

//! Data carried through each workflow run. Handlers receive these wrapped in
//! `storefront_flow::FlowContext`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Order, OrderItem, OrderItemDetail, OrderStatus, ReturnRequest};
use crate::services::auth_service::Caller;
use crate::state::AppState;
use crate::store::CommittedCancellation;

#[derive(Clone)]
pub struct CancelItemCtxData {
  pub app_state: AppState,
  pub caller: Caller,
  pub order_item_id: Uuid,
  pub cancelled_quantity: i32,
  /// Load the order's items with product data after committing.
  pub include_item_details: bool,
  pub requested_at: DateTime<Utc>,

  pub order_item: Option<OrderItem>,
  pub order: Option<Order>,
  pub committed: Option<CommittedCancellation>,
  pub item_details: Option<Vec<OrderItemDetail>>,
}

impl CancelItemCtxData {
  pub fn new(app_state: AppState, caller: Caller, order_item_id: Uuid, cancelled_quantity: i32) -> Self {
    Self {
      app_state,
      caller,
      order_item_id,
      cancelled_quantity,
      include_item_details: false,
      requested_at: Utc::now(),
      order_item: None,
      order: None,
      committed: None,
      item_details: None,
    }
  }

  pub fn with_item_details(mut self) -> Self {
    self.include_item_details = true;
    self
  }
}

#[derive(Clone)]
pub struct ReturnRequestCtxData {
  pub app_state: AppState,
  pub caller: Caller,
  pub order_id: Uuid,
  pub order_item_id: Uuid,
  pub quantity: i32,
  pub reason: String,
  pub requested_at: DateTime<Utc>,

  pub order: Option<Order>,
  pub created: Option<ReturnRequest>,
}

impl ReturnRequestCtxData {
  pub fn new(
    app_state: AppState,
    caller: Caller,
    order_id: Uuid,
    order_item_id: Uuid,
    quantity: i32,
    reason: String,
  ) -> Self {
    Self {
      app_state,
      caller,
      order_id,
      order_item_id,
      quantity,
      reason,
      requested_at: Utc::now(),
      order: None,
      created: None,
    }
  }
}

#[derive(Clone)]
pub struct OrderStatusCtxData {
  pub app_state: AppState,
  pub caller: Caller,
  pub order_id: Uuid,
  pub requested_status: OrderStatus,
  pub requested_at: DateTime<Utc>,

  pub order: Option<Order>,
  /// Set when the order actually moved to `requested_status`.
  pub changed: bool,
}

impl OrderStatusCtxData {
  pub fn new(app_state: AppState, caller: Caller, order_id: Uuid, requested_status: OrderStatus) -> Self {
    Self {
      app_state,
      caller,
      order_id,
      requested_status,
      requested_at: Utc::now(),
      order: None,
      changed: false,
    }
  }
}
