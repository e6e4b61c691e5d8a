// core/src/core/control.rs

/// Returned by every handler to tell the engine what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
  Continue,
  /// End the run now. Remaining handlers of the current step and all later
  /// steps are not executed.
  Halt,
}

/// How a flow run ended when no handler failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
  Completed,
  Halted { step: String },
}

impl FlowOutcome {
  pub fn is_completed(&self) -> bool {
    matches!(self, FlowOutcome::Completed)
  }

  /// Name of the step whose handler halted the run, if any.
  pub fn halted_at(&self) -> Option<&str> {
    match self {
      FlowOutcome::Completed => None,
      FlowOutcome::Halted { step } => Some(step.as_str()),
    }
  }
}
