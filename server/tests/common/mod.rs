// server/tests/common/mod.rs
#![allow(dead_code)]

use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

use storefront::config::AppConfig;
use storefront::models::{Order, OrderItem, OrderStatus, Product};
use storefront::services::auth_service::hash_service_key;
use storefront::services::cancellation;
use storefront::services::tokens::{issue_token, Role, TokenClaims};
use storefront::state::AppState;
use storefront::store::MemoryOrderStore;

pub const TOKEN_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const SERVICE_KEY: &str = "integration-service-key";

static SERVICE_KEY_HASH: Lazy<String> =
  Lazy::new(|| hash_service_key(SERVICE_KEY).expect("service key should hash"));

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn test_config(restore_stock: bool) -> AppConfig {
  let hash = SERVICE_KEY_HASH.clone();
  let restore = restore_stock.to_string();
  AppConfig::from_lookup(move |name| match name {
    "STORE_BACKEND" => Some("memory".to_string()),
    "AUTH_TOKEN_SECRET" => Some(TOKEN_SECRET.to_string()),
    "SERVICE_KEY_HASH" => Some(hash.clone()),
    "RESTORE_STOCK_ON_CANCEL" => Some(restore.clone()),
    _ => None,
  })
  .expect("test configuration should load")
}

pub struct TestWorld {
  pub store: Arc<MemoryOrderStore>,
  pub state: AppState,
}

impl TestWorld {
  pub fn new() -> Self {
    Self::with_stock_restore(false)
  }

  pub fn with_stock_restore(restore_stock: bool) -> Self {
    setup_tracing();
    let store = Arc::new(MemoryOrderStore::new());
    let state = AppState::build(store.clone(), Arc::new(test_config(restore_stock)));
    Self { store, state }
  }

  /// Inserts an order for `user_id` with one product per `(price, quantity,
  /// cancelled)` line. Totals are consistent with the lines.
  pub fn seed_order(
    &self,
    user_id: Uuid,
    status: OrderStatus,
    shipping_cost: i64,
    lines: &[(i64, i32, i32)],
  ) -> (Order, Vec<OrderItem>) {
    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let items: Vec<OrderItem> = lines
      .iter()
      .enumerate()
      .map(|(n, &(price, quantity, cancelled))| {
        let product = Product {
          id: Uuid::new_v4(),
          name: format!("Product {}", n + 1),
          description: None,
          price,
          image_url: Some(format!("https://img.example.com/{}.jpg", n + 1)),
          stock_quantity: 10,
          created_at: now,
          updated_at: now,
        };
        let item = OrderItem {
          id: Uuid::new_v4(),
          order_id,
          product_id: product.id,
          product_price: price,
          quantity,
          cancelled_quantity: cancelled,
          size: None,
          created_at: now + Duration::milliseconds(n as i64),
          cancelled_at: None,
        };
        self.store.insert_product(product);
        item
      })
      .collect();

    let totals = cancellation::recompute_totals(&items, shipping_cost);
    let order = Order {
      id: order_id,
      user_id,
      status,
      subtotal: totals.subtotal,
      tax: totals.tax,
      shipping_cost,
      total_amount: totals.total_amount,
      created_at: now,
      updated_at: now,
      cancelled_at: None,
    };
    self.store.insert_order(order.clone(), items.clone());
    (order, items)
  }
}

pub fn token_for(user_id: Uuid, role: Role) -> String {
  let claims = TokenClaims {
    sub: user_id,
    role,
    exp: (Utc::now() + Duration::hours(1)).timestamp(),
  };
  issue_token(&claims, TOKEN_SECRET.as_bytes()).expect("token should issue")
}

pub fn bearer(user_id: Uuid, role: Role) -> (&'static str, String) {
  ("Authorization", format!("Bearer {}", token_for(user_id, role)))
}
