// server/src/web/handlers/mod.rs

pub mod admin_handlers;
pub mod edge_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod return_handlers;
