// server/src/models/order_item.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::product::Product;

/// One line of an order. Cancellation only ever raises `cancelled_quantity`;
/// rows are not deleted while the order exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  /// Unit price captured at purchase time.
  pub product_price: i64,
  pub quantity: i32,
  pub cancelled_quantity: i32,
  pub size: Option<String>,
  pub created_at: DateTime<Utc>,
  pub cancelled_at: Option<DateTime<Utc>>,
}

impl OrderItem {
  /// Units still part of the order.
  pub fn active_quantity(&self) -> i32 {
    self.quantity - self.cancelled_quantity
  }

  pub fn is_fully_cancelled(&self) -> bool {
    self.active_quantity() == 0
  }

  pub fn active_line_total(&self) -> i64 {
    self.product_price * i64::from(self.active_quantity())
  }
}

/// An order item joined with catalog data, as returned to clients that render
/// the whole order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderItemDetail {
  #[serde(flatten)]
  #[sqlx(flatten)]
  pub item: OrderItem,
  pub product_name: Option<String>,
  pub product_image: Option<String>,
  pub is_cancelled: bool,
}

impl OrderItemDetail {
  pub fn new(item: OrderItem, product: Option<&Product>) -> Self {
    let is_cancelled = item.is_fully_cancelled();
    Self {
      product_name: product.map(|p| p.name.clone()),
      product_image: product.and_then(|p| p.image_url.clone()),
      is_cancelled,
      item,
    }
  }
}
