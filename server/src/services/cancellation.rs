// server/src/services/cancellation.rs

//! Rules for cancelling order items and recomputing order totals.
//!
//! Both store implementations call into these functions from inside their
//! commit, so the arithmetic exists exactly once.

use chrono::{DateTime, Utc};

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderItem, OrderStatus};

/// No tax engine is wired in; tax is fixed at zero by policy.
pub const TAX_AMOUNT: i64 = 0;

/// Rejects orders that can no longer be modified by a cancellation.
pub fn ensure_cancellable(order: &Order) -> Result<()> {
  match order.status {
    OrderStatus::Cancelled => Err(AppError::InvalidState("Order is already cancelled".to_string())),
    OrderStatus::Delivered => Err(AppError::InvalidState(
      "Cannot cancel items from a delivered order".to_string(),
    )),
    _ => Ok(()),
  }
}

pub fn remaining_quantity(item: &OrderItem) -> i32 {
  item.quantity - item.cancelled_quantity
}

pub fn ensure_positive_quantity(requested: i32) -> Result<()> {
  if requested <= 0 {
    return Err(AppError::Validation(
      "cancelled_quantity must be a positive integer".to_string(),
    ));
  }
  Ok(())
}

pub fn ensure_within_remaining(item: &OrderItem, requested: i32) -> Result<()> {
  ensure_positive_quantity(requested)?;
  let remaining = remaining_quantity(item);
  if requested > remaining {
    return Err(AppError::Validation(format!(
      "Cannot cancel {} unit(s): only {} remaining for this item",
      requested, remaining
    )));
  }
  Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
  pub subtotal: i64,
  pub tax: i64,
  pub total_amount: i64,
  pub all_items_cancelled: bool,
}

/// Full recomputation over every item of the order.
pub fn recompute_totals(items: &[OrderItem], shipping_cost: i64) -> OrderTotals {
  let subtotal: i64 = items.iter().map(OrderItem::active_line_total).sum();
  let tax = TAX_AMOUNT;
  OrderTotals {
    subtotal,
    tax,
    total_amount: subtotal + shipping_cost + tax,
    all_items_cancelled: items.iter().all(OrderItem::is_fully_cancelled),
  }
}

/// Status an order moves to after one of its items was cancelled.
pub fn next_status_after_cancellation(prior: OrderStatus, all_items_cancelled: bool) -> OrderStatus {
  if all_items_cancelled {
    return OrderStatus::Cancelled;
  }
  match prior {
    // Partial fulfilment is still pending.
    OrderStatus::Paid | OrderStatus::Completed => OrderStatus::Processing,
    other => other,
  }
}

/// Adds `quantity` cancelled units to `item`.
pub fn apply_to_item(item: &mut OrderItem, quantity: i32, at: DateTime<Utc>) -> Result<()> {
  ensure_within_remaining(item, quantity)?;
  item.cancelled_quantity += quantity;
  item.cancelled_at = Some(at);
  Ok(())
}

/// Writes recomputed totals and the derived status into `order`.
pub fn apply_to_order(order: &mut Order, totals: &OrderTotals, at: DateTime<Utc>) {
  order.subtotal = totals.subtotal;
  order.tax = totals.tax;
  order.total_amount = totals.total_amount;
  order.updated_at = at;
  order.status = next_status_after_cancellation(order.status, totals.all_items_cancelled);
  if totals.all_items_cancelled {
    order.cancelled_at = Some(at);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  fn item(order_id: Uuid, price: i64, quantity: i32, cancelled: i32) -> OrderItem {
    OrderItem {
      id: Uuid::new_v4(),
      order_id,
      product_id: Uuid::new_v4(),
      product_price: price,
      quantity,
      cancelled_quantity: cancelled,
      size: None,
      created_at: Utc::now(),
      cancelled_at: None,
    }
  }

  fn order(status: OrderStatus, shipping_cost: i64) -> Order {
    let now = Utc::now();
    Order {
      id: Uuid::new_v4(),
      user_id: Uuid::new_v4(),
      status,
      subtotal: 0,
      tax: 0,
      shipping_cost,
      total_amount: 0,
      created_at: now,
      updated_at: now,
      cancelled_at: None,
    }
  }

  #[test]
  fn totals_follow_active_quantities() {
    let o = order(OrderStatus::Paid, 10);
    let items = vec![item(o.id, 100, 2, 1), item(o.id, 50, 1, 0)];
    let totals = recompute_totals(&items, o.shipping_cost);
    assert_eq!(totals.subtotal, 150);
    assert_eq!(totals.tax, 0);
    assert_eq!(totals.total_amount, 160);
    assert!(!totals.all_items_cancelled);
  }

  #[test]
  fn fully_cancelled_items_zero_the_subtotal() {
    let o = order(OrderStatus::Pending, 0);
    let items = vec![item(o.id, 999, 3, 3)];
    let totals = recompute_totals(&items, 0);
    assert_eq!(totals.subtotal, 0);
    assert_eq!(totals.total_amount, 0);
    assert!(totals.all_items_cancelled);
  }

  #[test]
  fn status_rules() {
    use OrderStatus::*;
    assert_eq!(next_status_after_cancellation(Paid, false), Processing);
    assert_eq!(next_status_after_cancellation(Completed, false), Processing);
    assert_eq!(next_status_after_cancellation(Pending, false), Pending);
    assert_eq!(next_status_after_cancellation(Shipped, false), Shipped);
    assert_eq!(next_status_after_cancellation(Processing, false), Processing);
    assert_eq!(next_status_after_cancellation(Paid, true), Cancelled);
    assert_eq!(next_status_after_cancellation(Shipped, true), Cancelled);
  }

  #[test]
  fn over_cancellation_names_the_remaining_count() {
    let it = item(Uuid::new_v4(), 10, 3, 2);
    let err = ensure_within_remaining(&it, 2).unwrap_err();
    match err {
      AppError::Validation(msg) => assert!(msg.contains("only 1 remaining")),
      other => panic!("expected validation error, got {:?}", other),
    }
    assert!(ensure_within_remaining(&it, 1).is_ok());
    assert!(ensure_within_remaining(&it, 0).is_err());
  }

  #[test]
  fn terminal_states_reject_cancellation() {
    assert!(matches!(
      ensure_cancellable(&order(OrderStatus::Cancelled, 0)),
      Err(AppError::InvalidState(_))
    ));
    assert!(matches!(
      ensure_cancellable(&order(OrderStatus::Delivered, 0)),
      Err(AppError::InvalidState(_))
    ));
    assert!(ensure_cancellable(&order(OrderStatus::Shipped, 0)).is_ok());
  }

  #[test]
  fn applying_to_order_stamps_cancellation_only_when_everything_is_gone() {
    let now = Utc::now();
    let mut o = order(OrderStatus::Paid, 5);
    let partial = OrderTotals {
      subtotal: 20,
      tax: 0,
      total_amount: 25,
      all_items_cancelled: false,
    };
    apply_to_order(&mut o, &partial, now);
    assert_eq!(o.status, OrderStatus::Processing);
    assert!(o.cancelled_at.is_none());

    let full = OrderTotals {
      subtotal: 0,
      tax: 0,
      total_amount: 5,
      all_items_cancelled: true,
    };
    apply_to_order(&mut o, &full, now);
    assert_eq!(o.status, OrderStatus::Cancelled);
    assert_eq!(o.cancelled_at, Some(now));
    assert_eq!(o.total_amount, 5);
  }
}
