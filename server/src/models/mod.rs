// server/src/models/mod.rs

//! Data structures representing database entities.

pub mod order;
pub mod order_item;
pub mod product;
pub mod return_request;

pub use order::{Order, OrderStatus};
pub use order_item::{OrderItem, OrderItemDetail};
pub use product::Product;
pub use return_request::{ReturnRequest, ReturnStatus};
