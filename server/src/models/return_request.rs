// server/src/models/return_request.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "return_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
  Pending,
  Approved,
  Rejected,
}

impl ReturnStatus {
  /// Pending and approved requests reserve units of the item; rejected ones
  /// release them.
  pub fn reserves_units(self) -> bool {
    matches!(self, ReturnStatus::Pending | ReturnStatus::Approved)
  }
}

/// A post-delivery request to send back already fulfilled units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ReturnRequest {
  pub id: Uuid,
  pub order_id: Uuid,
  pub order_item_id: Uuid,
  pub user_id: Uuid,
  pub quantity: i32,
  pub reason: String,
  pub status: ReturnStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub reviewed_at: Option<DateTime<Utc>>,
}
