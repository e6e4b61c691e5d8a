// core/src/lib.rs

//! Asynchronous step pipelines for the storefront service.
//!
//! A [`Flow`] is an ordered list of named steps over one shared
//! [`FlowContext`]. Each step may carry `before`, `on` and `after` handlers,
//! can be optional or skipped by a predicate, and any handler may halt the
//! run early. A [`FlowRegistry`] stores flows by context type so callers only
//! need the context to start a workflow.

pub mod core;
pub mod error;
pub mod flow;
pub mod registry;

pub use crate::core::context::{FlowContext, Handler};
pub use crate::core::control::{FlowOutcome, StepControl};
pub use crate::core::step::{skip_when, SkipCondition, StepDef};
pub use crate::error::{FlowError, FlowResult};
pub use crate::flow::Flow;
pub use crate::registry::FlowRegistry;
