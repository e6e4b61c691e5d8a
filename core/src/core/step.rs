// core/src/core/step.rs

use super::FlowContext;
use std::sync::Arc;

/// Predicate evaluated before a step; `true` skips the step.
pub type SkipCondition<TData> = Arc<dyn Fn(&TData) -> bool + Send + Sync + 'static>;

/// Wraps a closure into a [`SkipCondition`].
pub fn skip_when<TData, F>(f: F) -> Option<SkipCondition<TData>>
where
  F: Fn(&TData) -> bool + Send + Sync + 'static,
{
  Some(Arc::new(f))
}

#[derive(Clone)]
pub struct StepDef<TData: 'static + Send + Sync> {
  pub name: String,
  pub optional: bool,
  pub skip_if: Option<SkipCondition<TData>>,
}

impl<TData: 'static + Send + Sync> StepDef<TData> {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      optional: false,
      skip_if: None,
    }
  }

  pub(crate) fn should_skip(&self, ctx: &FlowContext<TData>) -> bool {
    match &self.skip_if {
      Some(cond) => ctx.with(|data| cond(data)),
      None => false,
    }
  }
}

impl<TData: 'static + Send + Sync> std::fmt::Debug for StepDef<TData> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("has_skip_if", &self.skip_if.is_some())
      .finish()
  }
}
