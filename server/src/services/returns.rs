// server/src/services/returns.rs

//! Rules for post-delivery return requests.

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderItem, OrderStatus, ReturnRequest, ReturnStatus};

const MAX_REASON_LEN: usize = 500;

pub fn ensure_returnable_order(order: &Order) -> Result<()> {
  match order.status {
    OrderStatus::Delivered | OrderStatus::Completed => Ok(()),
    other => Err(AppError::InvalidState(format!(
      "Returns can only be requested for delivered orders (order is {})",
      other
    ))),
  }
}

pub fn validate_reason(reason: &str) -> Result<String> {
  let trimmed = reason.trim();
  if trimmed.is_empty() {
    return Err(AppError::Validation("reason must not be empty".to_string()));
  }
  if trimmed.chars().count() > MAX_REASON_LEN {
    return Err(AppError::Validation(format!(
      "reason must be at most {} characters",
      MAX_REASON_LEN
    )));
  }
  Ok(trimmed.to_string())
}

/// Units of `item` that can still be put into a new return request.
pub fn returnable_quantity(item: &OrderItem, existing: &[ReturnRequest]) -> i32 {
  let reserved: i32 = existing
    .iter()
    .filter(|r| r.order_item_id == item.id && r.status.reserves_units())
    .map(|r| r.quantity)
    .sum();
  (item.active_quantity() - reserved).max(0)
}

pub fn ensure_return_quantity(item: &OrderItem, existing: &[ReturnRequest], requested: i32) -> Result<()> {
  if requested <= 0 {
    return Err(AppError::Validation("quantity must be a positive integer".to_string()));
  }
  let available = returnable_quantity(item, existing);
  if requested > available {
    return Err(AppError::Validation(format!(
      "Cannot return {} unit(s): only {} available for return",
      requested, available
    )));
  }
  Ok(())
}

pub fn ensure_reviewable(request: &ReturnRequest, decision: ReturnStatus) -> Result<()> {
  if decision == ReturnStatus::Pending {
    return Err(AppError::Validation(
      "status must be 'approved' or 'rejected'".to_string(),
    ));
  }
  if request.status != ReturnStatus::Pending {
    return Err(AppError::InvalidState(
      "Return request has already been reviewed".to_string(),
    ));
  }
  Ok(())
}
