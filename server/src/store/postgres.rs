// server/src/store/postgres.rs

//! PostgreSQL store. Schema management happens outside this service; the
//! queries expect the tables and enum types named below.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{
  stale_item_conflict, CancellationCommit, CommittedCancellation, NewReturnRequest, OrderStore, StatusTransition,
};
use crate::errors::{AppError, Result};
use crate::models::{Order, OrderItem, OrderItemDetail, OrderStatus, Product, ReturnRequest, ReturnStatus};
use crate::services::{cancellation, returns};

#[derive(Debug, Clone)]
pub struct PgOrderStore {
  pool: PgPool,
}

impl PgOrderStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl OrderStore for PgOrderStore {
  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
      "SELECT id, user_id, status, subtotal, tax, shipping_cost, total_amount, created_at, updated_at, cancelled_at \
       FROM orders WHERE id = $1",
    )
    .bind(order_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(order)
  }

  async fn find_order_item(&self, order_item_id: Uuid) -> Result<Option<OrderItem>> {
    let item = sqlx::query_as::<_, OrderItem>(
      "SELECT id, order_id, product_id, product_price, quantity, cancelled_quantity, size, created_at, cancelled_at \
       FROM order_items WHERE id = $1",
    )
    .bind(order_item_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(item)
  }

  async fn list_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
      "SELECT id, order_id, product_id, product_price, quantity, cancelled_quantity, size, created_at, cancelled_at \
       FROM order_items WHERE order_id = $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(items)
  }

  async fn list_order_item_details(&self, order_id: Uuid) -> Result<Vec<OrderItemDetail>> {
    let details = sqlx::query_as::<_, OrderItemDetail>(
      "SELECT oi.id, oi.order_id, oi.product_id, oi.product_price, oi.quantity, oi.cancelled_quantity, oi.size, \
              oi.created_at, oi.cancelled_at, \
              p.name AS product_name, p.image_url AS product_image, \
              (oi.quantity - oi.cancelled_quantity) = 0 AS is_cancelled \
       FROM order_items oi \
       LEFT JOIN products p ON p.id = oi.product_id \
       WHERE oi.order_id = $1 \
       ORDER BY oi.created_at ASC, oi.id ASC",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(details)
  }

  async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(
      "SELECT id, user_id, status, subtotal, tax, shipping_cost, total_amount, created_at, updated_at, cancelled_at \
       FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(orders)
  }

  #[instrument(name = "pg_store::commit_cancellation", skip(self, commit), fields(order_item_id = %commit.order_item_id, order_id = %commit.order_id))]
  async fn commit_cancellation(&self, commit: &CancellationCommit) -> Result<CommittedCancellation> {
    let mut tx = self.pool.begin().await?;

    // Row lock on the parent serialises cancellations within one order.
    let order = sqlx::query_as::<_, Order>(
      "SELECT id, user_id, status, subtotal, tax, shipping_cost, total_amount, created_at, updated_at, cancelled_at \
       FROM orders WHERE id = $1 FOR UPDATE",
    )
    .bind(commit.order_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    cancellation::ensure_cancellable(&order)?;

    let order_item = sqlx::query_as::<_, OrderItem>(
      "UPDATE order_items \
       SET cancelled_quantity = cancelled_quantity + $1, cancelled_at = $2 \
       WHERE id = $3 AND order_id = $4 AND cancelled_quantity = $5 AND cancelled_quantity + $1 <= quantity \
       RETURNING id, order_id, product_id, product_price, quantity, cancelled_quantity, size, created_at, cancelled_at",
    )
    .bind(commit.quantity)
    .bind(commit.at)
    .bind(commit.order_item_id)
    .bind(commit.order_id)
    .bind(commit.observed_cancelled_quantity)
    .fetch_optional(&mut *tx)
    .await?;
    let order_item = match order_item {
      Some(item) => item,
      None => {
        warn!("Conditional item update matched no row; rolling back.");
        tx.rollback().await?;
        return Err(stale_item_conflict(commit.order_item_id));
      }
    };

    let items = sqlx::query_as::<_, OrderItem>(
      "SELECT id, order_id, product_id, product_price, quantity, cancelled_quantity, size, created_at, cancelled_at \
       FROM order_items WHERE order_id = $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(commit.order_id)
    .fetch_all(&mut *tx)
    .await?;
    let totals = cancellation::recompute_totals(&items, order.shipping_cost);
    let status = cancellation::next_status_after_cancellation(order.status, totals.all_items_cancelled);
    let cancelled_at = if totals.all_items_cancelled {
      Some(commit.at)
    } else {
      order.cancelled_at
    };

    let order = sqlx::query_as::<_, Order>(
      "UPDATE orders \
       SET subtotal = $2, tax = $3, total_amount = $4, status = $5, cancelled_at = $6, updated_at = $7 \
       WHERE id = $1 \
       RETURNING id, user_id, status, subtotal, tax, shipping_cost, total_amount, created_at, updated_at, cancelled_at",
    )
    .bind(commit.order_id)
    .bind(totals.subtotal)
    .bind(totals.tax)
    .bind(totals.total_amount)
    .bind(status)
    .bind(cancelled_at)
    .bind(commit.at)
    .fetch_one(&mut *tx)
    .await?;

    if commit.restore_stock {
      let restored = sqlx::query("UPDATE products SET stock_quantity = stock_quantity + $1, updated_at = $2 WHERE id = $3")
        .bind(commit.quantity)
        .bind(commit.at)
        .bind(order_item.product_id)
        .execute(&mut *tx)
        .await?;
      debug!(rows = restored.rows_affected(), "Restored product stock.");
    }

    tx.commit().await?;
    Ok(CommittedCancellation {
      order,
      order_item,
      all_items_cancelled: totals.all_items_cancelled,
    })
  }

  async fn transition_order_status(&self, transition: &StatusTransition) -> Result<Order> {
    let cancelled_at = (transition.to == OrderStatus::Cancelled).then_some(transition.at);
    let updated = sqlx::query_as::<_, Order>(
      "UPDATE orders \
       SET status = $3, updated_at = $4, cancelled_at = COALESCE($5, cancelled_at) \
       WHERE id = $1 AND status = $2 \
       RETURNING id, user_id, status, subtotal, tax, shipping_cost, total_amount, created_at, updated_at, cancelled_at",
    )
    .bind(transition.order_id)
    .bind(transition.from)
    .bind(transition.to)
    .bind(transition.at)
    .bind(cancelled_at)
    .fetch_optional(&self.pool)
    .await?;

    match updated {
      Some(order) => Ok(order),
      None => match self.find_order(transition.order_id).await? {
        Some(current) => Err(AppError::Conflict(format!(
          "Order status changed to '{}' concurrently; reload and retry",
          current.status
        ))),
        None => Err(AppError::NotFound("Order not found".to_string())),
      },
    }
  }

  async fn list_products(&self) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
      "SELECT id, name, description, price, image_url, stock_quantity, created_at, updated_at \
       FROM products ORDER BY name ASC",
    )
    .fetch_all(&self.pool)
    .await?;
    Ok(products)
  }

  async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
      "SELECT id, name, description, price, image_url, stock_quantity, created_at, updated_at \
       FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(product)
  }

  #[instrument(name = "pg_store::create_return_request", skip(self, request), fields(order_item_id = %request.order_item_id))]
  async fn create_return_request(&self, request: &NewReturnRequest) -> Result<ReturnRequest> {
    let mut tx = self.pool.begin().await?;

    let item = sqlx::query_as::<_, OrderItem>(
      "SELECT id, order_id, product_id, product_price, quantity, cancelled_quantity, size, created_at, cancelled_at \
       FROM order_items WHERE id = $1 AND order_id = $2 FOR UPDATE",
    )
    .bind(request.order_item_id)
    .bind(request.order_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Order item not found".to_string()))?;

    let existing = sqlx::query_as::<_, ReturnRequest>(
      "SELECT id, order_id, order_item_id, user_id, quantity, reason, status, created_at, updated_at, reviewed_at \
       FROM return_requests WHERE order_item_id = $1",
    )
    .bind(item.id)
    .fetch_all(&mut *tx)
    .await?;
    returns::ensure_return_quantity(&item, &existing, request.quantity)?;

    let created = sqlx::query_as::<_, ReturnRequest>(
      "INSERT INTO return_requests (id, order_id, order_item_id, user_id, quantity, reason, status, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
       RETURNING id, order_id, order_item_id, user_id, quantity, reason, status, created_at, updated_at, reviewed_at",
    )
    .bind(Uuid::new_v4())
    .bind(request.order_id)
    .bind(request.order_item_id)
    .bind(request.user_id)
    .bind(request.quantity)
    .bind(&request.reason)
    .bind(ReturnStatus::Pending)
    .bind(request.at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(created)
  }

  async fn find_return_request(&self, return_id: Uuid) -> Result<Option<ReturnRequest>> {
    let found = sqlx::query_as::<_, ReturnRequest>(
      "SELECT id, order_id, order_item_id, user_id, quantity, reason, status, created_at, updated_at, reviewed_at \
       FROM return_requests WHERE id = $1",
    )
    .bind(return_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(found)
  }

  async fn list_return_requests(&self, order_id: Uuid) -> Result<Vec<ReturnRequest>> {
    let found = sqlx::query_as::<_, ReturnRequest>(
      "SELECT id, order_id, order_item_id, user_id, quantity, reason, status, created_at, updated_at, reviewed_at \
       FROM return_requests WHERE order_id = $1 ORDER BY created_at ASC",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(found)
  }

  async fn review_return_request(
    &self,
    return_id: Uuid,
    decision: ReturnStatus,
    at: DateTime<Utc>,
  ) -> Result<ReturnRequest> {
    let current = self
      .find_return_request(return_id)
      .await?
      .ok_or_else(|| AppError::NotFound("Return request not found".to_string()))?;
    returns::ensure_reviewable(&current, decision)?;

    let reviewed = sqlx::query_as::<_, ReturnRequest>(
      "UPDATE return_requests SET status = $2, updated_at = $3, reviewed_at = $3 \
       WHERE id = $1 AND status = $4 \
       RETURNING id, order_id, order_item_id, user_id, quantity, reason, status, created_at, updated_at, reviewed_at",
    )
    .bind(return_id)
    .bind(decision)
    .bind(at)
    .bind(ReturnStatus::Pending)
    .fetch_optional(&self.pool)
    .await?;

    reviewed.ok_or_else(|| AppError::Conflict("Return request was reviewed concurrently".to_string()))
  }
}
