// server/src/store/memory.rs

//! In-process store for local runs and tests.
//!
//! Writes are staged on a copy of the tables and swapped in only when every
//! step succeeded, which gives the same all-or-nothing behaviour as a
//! database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{
  stale_item_conflict, CancellationCommit, CommittedCancellation, NewReturnRequest, OrderStore, StatusTransition,
};
use crate::errors::{AppError, Result};
use crate::models::{Order, OrderItem, OrderItemDetail, OrderStatus, Product, ReturnRequest, ReturnStatus};
use crate::services::{cancellation, returns};

#[derive(Debug, Default, Clone)]
struct Tables {
  orders: HashMap<Uuid, Order>,
  items: Vec<OrderItem>,
  products: HashMap<Uuid, Product>,
  returns: Vec<ReturnRequest>,
}

impl Tables {
  fn items_of(&self, order_id: Uuid) -> Vec<OrderItem> {
    let mut items: Vec<OrderItem> = self.items.iter().filter(|i| i.order_id == order_id).cloned().collect();
    items.sort_by_key(|i| (i.created_at, i.id));
    items
  }
}

#[derive(Debug, Default)]
pub struct MemoryOrderStore {
  tables: Mutex<Tables>,
  #[cfg(test)]
  fail_next_order_write: AtomicBool,
}

/// Ids of the rows created by [`MemoryOrderStore::seed_demo`].
#[derive(Debug, Clone, Copy)]
pub struct DemoSeed {
  pub customer_id: Uuid,
  pub order_id: Uuid,
  pub delivered_order_id: Uuid,
}

impl MemoryOrderStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert_product(&self, product: Product) {
    self.tables.lock().products.insert(product.id, product);
  }

  /// Inserts an order with its items. Items keep the given order.
  pub fn insert_order(&self, order: Order, items: Vec<OrderItem>) {
    let mut tables = self.tables.lock();
    tables.orders.insert(order.id, order);
    tables.items.extend(items);
  }

  /// Makes the next order update inside a cancellation commit fail after the
  /// item row has already been staged.
  #[cfg(test)]
  pub(crate) fn fail_next_order_write(&self) {
    self.fail_next_order_write.store(true, Ordering::SeqCst);
  }

  /// Populates a small catalogue with one open and one delivered order.
  pub fn seed_demo(&self) -> DemoSeed {
    let now = Utc::now();
    let customer_id = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001);
    let order_id = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0100);
    let delivered_order_id = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0200);

    let catalogue = [
      ("Linen Shirt", 4_500, "https://img.example.com/linen-shirt.jpg"),
      ("Canvas Tote", 1_800, "https://img.example.com/canvas-tote.jpg"),
      ("Wool Scarf", 2_900, "https://img.example.com/wool-scarf.jpg"),
    ];
    let products: Vec<Product> = catalogue
      .iter()
      .enumerate()
      .map(|(n, (name, price, image))| Product {
        id: Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_1000 + n as u128),
        name: name.to_string(),
        description: None,
        price: *price,
        image_url: Some(image.to_string()),
        stock_quantity: 25,
        created_at: now,
        updated_at: now,
      })
      .collect();

    let line = |n: u128, order_id: Uuid, product: &Product, quantity: i32, offset: i64| OrderItem {
      id: Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_2000 + n),
      order_id,
      product_id: product.id,
      product_price: product.price,
      quantity,
      cancelled_quantity: 0,
      size: Some("M".to_string()),
      created_at: now + Duration::milliseconds(offset),
      cancelled_at: None,
    };

    let open_items = vec![
      line(1, order_id, &products[0], 2, 0),
      line(2, order_id, &products[1], 1, 1),
    ];
    let delivered_items = vec![line(3, delivered_order_id, &products[2], 3, 2)];

    let order_for = |id: Uuid, status: OrderStatus, items: &[OrderItem]| {
      let totals = cancellation::recompute_totals(items, 500);
      Order {
        id,
        user_id: customer_id,
        status,
        subtotal: totals.subtotal,
        tax: totals.tax,
        shipping_cost: 500,
        total_amount: totals.total_amount,
        created_at: now,
        updated_at: now,
        cancelled_at: None,
      }
    };
    let open_order = order_for(order_id, OrderStatus::Paid, &open_items);
    let delivered_order = order_for(delivered_order_id, OrderStatus::Delivered, &delivered_items);

    for product in products {
      self.insert_product(product);
    }
    self.insert_order(open_order, open_items);
    self.insert_order(delivered_order, delivered_items);

    info!(%customer_id, %order_id, %delivered_order_id, "Seeded in-memory store with demo data.");
    DemoSeed {
      customer_id,
      order_id,
      delivered_order_id,
    }
  }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    Ok(self.tables.lock().orders.get(&order_id).cloned())
  }

  async fn find_order_item(&self, order_item_id: Uuid) -> Result<Option<OrderItem>> {
    Ok(self.tables.lock().items.iter().find(|i| i.id == order_item_id).cloned())
  }

  async fn list_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
    Ok(self.tables.lock().items_of(order_id))
  }

  async fn list_order_item_details(&self, order_id: Uuid) -> Result<Vec<OrderItemDetail>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .items_of(order_id)
        .into_iter()
        .map(|item| {
          let product = tables.products.get(&item.product_id);
          OrderItemDetail::new(item, product)
        })
        .collect(),
    )
  }

  async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let mut orders: Vec<Order> = self
      .tables
      .lock()
      .orders
      .values()
      .filter(|o| o.user_id == user_id)
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }

  #[instrument(name = "memory_store::commit_cancellation", skip(self, commit), fields(order_item_id = %commit.order_item_id))]
  async fn commit_cancellation(&self, commit: &CancellationCommit) -> Result<CommittedCancellation> {
    let mut tables = self.tables.lock();
    let mut staged = tables.clone();

    let order = staged
      .orders
      .get(&commit.order_id)
      .cloned()
      .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    cancellation::ensure_cancellable(&order)?;

    let item = staged
      .items
      .iter_mut()
      .find(|i| i.id == commit.order_item_id && i.order_id == commit.order_id)
      .ok_or_else(|| AppError::NotFound("Order item not found".to_string()))?;
    if item.cancelled_quantity != commit.observed_cancelled_quantity {
      return Err(stale_item_conflict(commit.order_item_id));
    }
    if commit.quantity > cancellation::remaining_quantity(item) {
      return Err(stale_item_conflict(commit.order_item_id));
    }
    cancellation::apply_to_item(item, commit.quantity, commit.at)?;
    let order_item = item.clone();

    #[cfg(test)]
    {
      if self.fail_next_order_write.swap(false, Ordering::SeqCst) {
        return Err(AppError::Internal("Order update failed".to_string()));
      }
    }

    let totals = cancellation::recompute_totals(&staged.items_of(commit.order_id), order.shipping_cost);
    let order = {
      let stored = staged
        .orders
        .get_mut(&commit.order_id)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
      cancellation::apply_to_order(stored, &totals, commit.at);
      stored.clone()
    };

    if commit.restore_stock {
      if let Some(product) = staged.products.get_mut(&order_item.product_id) {
        product.stock_quantity += commit.quantity;
        product.updated_at = commit.at;
        debug!(product_id = %product.id, stock = product.stock_quantity, "Restored product stock.");
      }
    }

    *tables = staged;
    Ok(CommittedCancellation {
      order,
      order_item,
      all_items_cancelled: totals.all_items_cancelled,
    })
  }

  async fn transition_order_status(&self, transition: &StatusTransition) -> Result<Order> {
    let mut tables = self.tables.lock();
    let order = tables
      .orders
      .get_mut(&transition.order_id)
      .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    if order.status != transition.from {
      return Err(AppError::Conflict(format!(
        "Order status changed to '{}' concurrently; reload and retry",
        order.status
      )));
    }
    order.status = transition.to;
    order.updated_at = transition.at;
    if transition.to == OrderStatus::Cancelled {
      order.cancelled_at = Some(transition.at);
    }
    Ok(order.clone())
  }

  async fn list_products(&self) -> Result<Vec<Product>> {
    let mut products: Vec<Product> = self.tables.lock().products.values().cloned().collect();
    products.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(products)
  }

  async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>> {
    Ok(self.tables.lock().products.get(&product_id).cloned())
  }

  async fn create_return_request(&self, request: &NewReturnRequest) -> Result<ReturnRequest> {
    let mut tables = self.tables.lock();
    let item = tables
      .items
      .iter()
      .find(|i| i.id == request.order_item_id && i.order_id == request.order_id)
      .cloned()
      .ok_or_else(|| AppError::NotFound("Order item not found".to_string()))?;
    let existing: Vec<ReturnRequest> = tables
      .returns
      .iter()
      .filter(|r| r.order_item_id == item.id)
      .cloned()
      .collect();
    returns::ensure_return_quantity(&item, &existing, request.quantity)?;

    let created = ReturnRequest {
      id: Uuid::new_v4(),
      order_id: request.order_id,
      order_item_id: request.order_item_id,
      user_id: request.user_id,
      quantity: request.quantity,
      reason: request.reason.clone(),
      status: ReturnStatus::Pending,
      created_at: request.at,
      updated_at: request.at,
      reviewed_at: None,
    };
    tables.returns.push(created.clone());
    Ok(created)
  }

  async fn find_return_request(&self, return_id: Uuid) -> Result<Option<ReturnRequest>> {
    Ok(self.tables.lock().returns.iter().find(|r| r.id == return_id).cloned())
  }

  async fn list_return_requests(&self, order_id: Uuid) -> Result<Vec<ReturnRequest>> {
    let mut found: Vec<ReturnRequest> = self
      .tables
      .lock()
      .returns
      .iter()
      .filter(|r| r.order_id == order_id)
      .cloned()
      .collect();
    found.sort_by_key(|r| r.created_at);
    Ok(found)
  }

  async fn review_return_request(
    &self,
    return_id: Uuid,
    decision: ReturnStatus,
    at: DateTime<Utc>,
  ) -> Result<ReturnRequest> {
    let mut tables = self.tables.lock();
    let request = tables
      .returns
      .iter_mut()
      .find(|r| r.id == return_id)
      .ok_or_else(|| AppError::NotFound("Return request not found".to_string()))?;
    returns::ensure_reviewable(request, decision)?;
    request.status = decision;
    request.updated_at = at;
    request.reviewed_at = Some(at);
    Ok(request.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn commit_for(seed: &DemoSeed, store: &MemoryOrderStore, quantity: i32) -> CancellationCommit {
    let items = store.tables.lock().items_of(seed.order_id);
    CancellationCommit {
      order_id: seed.order_id,
      order_item_id: items[0].id,
      observed_cancelled_quantity: items[0].cancelled_quantity,
      quantity,
      restore_stock: false,
      at: Utc::now(),
    }
  }

  #[tokio::test]
  async fn failed_order_write_leaves_item_untouched() {
    let store = MemoryOrderStore::new();
    let seed = store.seed_demo();
    let before_items = store.list_order_items(seed.order_id).await.unwrap();
    let before_order = store.find_order(seed.order_id).await.unwrap().unwrap();

    store.fail_next_order_write();
    let err = store.commit_cancellation(&commit_for(&seed, &store, 1)).await.unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));

    assert_eq!(store.list_order_items(seed.order_id).await.unwrap(), before_items);
    assert_eq!(store.find_order(seed.order_id).await.unwrap().unwrap(), before_order);
  }

  #[tokio::test]
  async fn items_with_equal_timestamps_are_ordered_by_id() {
    let store = MemoryOrderStore::new();
    let seed = store.seed_demo();
    let at = Utc::now();
    let order_id = Uuid::new_v4();
    let mut ids = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
    let items: Vec<OrderItem> = ids
      .iter()
      .rev()
      .map(|&id| OrderItem {
        id,
        order_id,
        product_id: Uuid::new_v4(),
        product_price: 10,
        quantity: 1,
        cancelled_quantity: 0,
        size: None,
        created_at: at,
        cancelled_at: None,
      })
      .collect();
    let mut order = store.find_order(seed.order_id).await.unwrap().unwrap();
    order.id = order_id;
    store.insert_order(order, items);

    ids.sort();
    let listed: Vec<Uuid> = store.list_order_items(order_id).await.unwrap().iter().map(|i| i.id).collect();
    assert_eq!(listed, ids);
  }

  #[tokio::test]
  async fn stale_observation_is_a_conflict() {
    let store = MemoryOrderStore::new();
    let seed = store.seed_demo();
    let first = commit_for(&seed, &store, 1);
    let second = first.clone();

    store.commit_cancellation(&first).await.unwrap();
    let err = store.commit_cancellation(&second).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let item = store.find_order_item(first.order_item_id).await.unwrap().unwrap();
    assert_eq!(item.cancelled_quantity, 1);
  }

  #[tokio::test]
  async fn stock_is_restored_only_when_asked() {
    let store = MemoryOrderStore::new();
    let seed = store.seed_demo();
    let mut commit = commit_for(&seed, &store, 1);
    let product_id = store.find_order_item(commit.order_item_id).await.unwrap().unwrap().product_id;

    store.commit_cancellation(&commit).await.unwrap();
    assert_eq!(store.find_product(product_id).await.unwrap().unwrap().stock_quantity, 25);

    commit.observed_cancelled_quantity = 1;
    commit.restore_stock = true;
    store.commit_cancellation(&commit).await.unwrap();
    assert_eq!(store.find_product(product_id).await.unwrap().unwrap().stock_quantity, 26);
  }
}
