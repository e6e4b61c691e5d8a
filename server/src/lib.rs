// server/src/lib.rs

//! Storefront order service: item cancellation with total recomputation,
//! return requests and administrative order status changes, served over
//! actix-web on top of the `storefront-flow` workflow engine.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod web;
