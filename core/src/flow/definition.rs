// core/src/flow/definition.rs

//! The `Flow<TData, Err>` type and its structural editing methods.

use crate::core::context::Handler;
use crate::core::step::{SkipCondition, StepDef};
use crate::error::FlowError;
use std::collections::HashMap;

/// An ordered list of named steps over the context type `TData`.
///
/// Handlers return `Result<_, Err>`. Engine failures (for example a required
/// step without handlers) are converted into `Err` through `From<FlowError>`.
pub struct Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Declares a flow from `(name, optional, skip_if)` triples.
  pub fn new(name: impl Into<String>, step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(step_name, optional, skip_if)| StepDef {
        name: (*step_name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      name: name.into(),
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  fn position(&self, step_name: &str) -> Result<usize, FlowError> {
    self
      .steps
      .iter()
      .position(|s| s.name == step_name)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: step_name.to_string(),
      })
  }

  /// Panics when the step is unknown. Wiring a handler to a misspelled step
  /// is a programming error caught at startup.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if let Err(e) = self.position(step_name) {
      panic!("Flow '{}' setup error: {}", self.name, e);
    }
  }

  fn insert_at(&mut self, idx: usize, step: StepDef<TData>) -> Result<(), FlowError> {
    if self.steps.iter().any(|s| s.name == step.name) {
      return Err(FlowError::Internal(format!(
        "step '{}' already exists in flow '{}'",
        step.name, self.name
      )));
    }
    self.steps.insert(idx, step);
    Ok(())
  }

  pub fn insert_before(&mut self, existing: &str, step: StepDef<TData>) -> Result<(), FlowError> {
    let idx = self.position(existing)?;
    self.insert_at(idx, step)
  }

  pub fn insert_after(&mut self, existing: &str, step: StepDef<TData>) -> Result<(), FlowError> {
    let idx = self.position(existing)?;
    self.insert_at(idx + 1, step)
  }

  /// Removes a step together with every handler attached to it.
  pub fn remove_step(&mut self, step_name: &str) -> Result<(), FlowError> {
    let idx = self.position(step_name)?;
    self.steps.remove(idx);
    self.before.remove(step_name);
    self.on.remove(step_name);
    self.after.remove(step_name);
    Ok(())
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) -> Result<(), FlowError> {
    let idx = self.position(step_name)?;
    self.steps[idx].optional = optional;
    Ok(())
  }

  pub fn set_skip_if(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) -> Result<(), FlowError> {
    let idx = self.position(step_name)?;
    self.steps[idx].skip_if = skip_if;
    Ok(())
  }
}
