// server/src/pipelines/mod.rs

//! Defines and registers the workflows run by the service.

use crate::errors::AppError;
use storefront_flow::FlowRegistry;

pub mod contexts;

pub mod cancel_item_pipeline;
pub mod order_status_pipeline;
pub mod return_request_pipeline;

/// Registers every workflow with `flows`. Called once at startup.
pub fn register_all_pipelines(flows: &FlowRegistry<AppError>) {
  tracing::info!("Registering workflows...");

  cancel_item_pipeline::register_cancel_item_pipeline(flows);
  return_request_pipeline::register_return_request_pipeline(flows);
  order_status_pipeline::register_order_status_pipeline(flows);

  tracing::info!("All workflows registered.");
}
