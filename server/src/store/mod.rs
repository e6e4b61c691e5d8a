// server/src/store/mod.rs

//! Persistence seam for orders, items, products and return requests.
//!
//! Every multi-row write goes through one method so an implementation can
//! make it atomic: either all rows change or none do.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{Order, OrderItem, OrderItemDetail, OrderStatus, Product, ReturnRequest, ReturnStatus};

pub use memory::MemoryOrderStore;
pub use postgres::PgOrderStore;

/// A cancellation decided by the workflow, ready to be committed.
#[derive(Debug, Clone)]
pub struct CancellationCommit {
  pub order_id: Uuid,
  pub order_item_id: Uuid,
  /// `cancelled_quantity` as read when the request was validated. The commit
  /// fails with a conflict if the stored value has moved on.
  pub observed_cancelled_quantity: i32,
  pub quantity: i32,
  pub restore_stock: bool,
  pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedCancellation {
  pub order: Order,
  pub order_item: OrderItem,
  pub all_items_cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct StatusTransition {
  pub order_id: Uuid,
  pub from: OrderStatus,
  pub to: OrderStatus,
  pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReturnRequest {
  pub order_id: Uuid,
  pub order_item_id: Uuid,
  pub user_id: Uuid,
  pub quantity: i32,
  pub reason: String,
  pub at: DateTime<Utc>,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>>;

  async fn find_order_item(&self, order_item_id: Uuid) -> Result<Option<OrderItem>>;

  /// Items of an order in creation order.
  async fn list_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>>;

  /// Items of an order joined with product name and image, in creation order.
  async fn list_order_item_details(&self, order_id: Uuid) -> Result<Vec<OrderItemDetail>>;

  /// Orders of one user, newest first.
  async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;

  /// Atomically adds cancelled units to an item, recomputes the parent
  /// order's totals and status, and optionally restores product stock.
  async fn commit_cancellation(&self, commit: &CancellationCommit) -> Result<CommittedCancellation>;

  /// Moves an order from `from` to `to`. Fails with a conflict if the order
  /// is no longer in `from`.
  async fn transition_order_status(&self, transition: &StatusTransition) -> Result<Order>;

  async fn list_products(&self) -> Result<Vec<Product>>;

  async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>>;

  /// Re-checks the returnable quantity and inserts the request atomically.
  async fn create_return_request(&self, request: &NewReturnRequest) -> Result<ReturnRequest>;

  async fn find_return_request(&self, return_id: Uuid) -> Result<Option<ReturnRequest>>;

  async fn list_return_requests(&self, order_id: Uuid) -> Result<Vec<ReturnRequest>>;

  /// Approves or rejects a pending request.
  async fn review_return_request(
    &self,
    return_id: Uuid,
    decision: ReturnStatus,
    at: DateTime<Utc>,
  ) -> Result<ReturnRequest>;
}

pub(crate) fn stale_item_conflict(order_item_id: Uuid) -> crate::errors::AppError {
  crate::errors::AppError::Conflict(format!(
    "Order item {} was modified concurrently; reload and retry",
    order_item_id
  ))
}
