// server/src/web/dto.rs

//! Request and response bodies. Requests reject unknown fields.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Order, OrderItem, OrderItemDetail, OrderStatus, ReturnStatus};
use crate::pipelines::cancel_item_pipeline::CancellationOutcome;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CancelItemRequest {
  pub order_item_id: Uuid,
  pub cancelled_quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelItemResponse {
  pub success: bool,
  pub order_item: OrderItem,
  pub order: Order,
  pub all_items_cancelled: bool,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub order_items: Option<Vec<OrderItemDetail>>,
}

impl CancelItemResponse {
  pub fn from_outcome(outcome: CancellationOutcome, cancelled_quantity: i32) -> Self {
    let message = if outcome.all_items_cancelled {
      format!(
        "Cancelled {} unit(s); all items are now cancelled and the order is cancelled",
        cancelled_quantity
      )
    } else {
      format!("Cancelled {} unit(s) of the order item", cancelled_quantity)
    };
    Self {
      success: true,
      order_item: outcome.order_item,
      order: outcome.order,
      all_items_cancelled: outcome.all_items_cancelled,
      message,
      order_items: outcome.order_items,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
  pub order: Order,
  pub order_items: Vec<OrderItemDetail>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReturnRequest {
  pub order_item_id: Uuid,
  pub quantity: i32,
  pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderStatusRequest {
  pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusResponse {
  pub order: Order,
  pub changed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewReturnRequest {
  pub status: ReturnStatus,
}
