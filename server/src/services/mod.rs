// server/src/services/mod.rs

//! Domain rules shared by the workflows and the stores.

pub mod auth_service;
pub mod cancellation;
pub mod returns;
pub mod tokens;
