// core/src/flow/execution.rs

use crate::core::context::FlowContext;
use crate::core::control::{FlowOutcome, StepControl};
use crate::error::FlowError;
use crate::flow::definition::Flow;
use crate::flow::hooks::Phase;
use tracing::{event, info_span, Instrument, Level};

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn has_handlers(&self, step_name: &str) -> bool {
    Phase::ALL
      .iter()
      .any(|phase| self.handlers(*phase).get(step_name).is_some_and(|v| !v.is_empty()))
  }

  /// Runs every handler of one phase. `Ok(Some(_))` means a handler halted.
  async fn run_phase(&self, phase: Phase, step_name: &str, ctx: &FlowContext<TData>) -> Result<Option<FlowOutcome>, Err> {
    let Some(handlers) = self.handlers(phase).get(step_name) else {
      return Ok(None);
    };
    for handler in handlers {
      match handler(ctx.clone()).await {
        Ok(StepControl::Continue) => {}
        Ok(StepControl::Halt) => {
          event!(Level::INFO, phase = phase.label(), "Flow halted by handler.");
          return Ok(Some(FlowOutcome::Halted {
            step: step_name.to_string(),
          }));
        }
        Err(e) => {
          event!(Level::WARN, phase = phase.label(), error = %e, "Handler failed.");
          return Err(e);
        }
      }
    }
    Ok(None)
  }

  /// Executes the flow against `ctx`.
  ///
  /// Steps run in declaration order, each through its before, on and after
  /// phases. The first handler error ends the run and is returned as is.
  pub async fn run(&self, ctx: FlowContext<TData>) -> Result<FlowOutcome, Err> {
    event!(Level::DEBUG, flow = %self.name, num_steps = self.steps.len(), "Flow run starting.");

    for (step_idx, step) in self.steps.iter().enumerate() {
      let step_span = info_span!("flow_step", flow = %self.name, step = %step.name, step_index = step_idx);

      if step.should_skip(&ctx) {
        event!(parent: &step_span, Level::DEBUG, "Step skipped by condition.");
        continue;
      }

      if !self.has_handlers(&step.name) {
        if step.optional {
          event!(parent: &step_span, Level::DEBUG, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(parent: &step_span, Level::ERROR, "Required step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step.name.clone(),
        }));
      }

      for phase in Phase::ALL {
        let halted = self
          .run_phase(phase, &step.name, &ctx)
          .instrument(step_span.clone())
          .await?;
        if let Some(outcome) = halted {
          return Ok(outcome);
        }
      }
    }

    event!(Level::DEBUG, flow = %self.name, "Flow run completed.");
    Ok(FlowOutcome::Completed)
  }
}
