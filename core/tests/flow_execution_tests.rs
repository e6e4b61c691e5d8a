// core/tests/flow_execution_tests.rs
mod common;

use common::*;
use serial_test::serial;
use storefront_flow::{skip_when, Flow, FlowContext, FlowOutcome, StepControl};

#[tokio::test]
#[serial]
async fn steps_run_in_declaration_order() {
  setup_tracing();
  let mut flow = Flow::<TallyContext, TestError>::new(
    "ordered",
    &[("one", false, None), ("two", false, None), ("three", false, None)],
  );
  flow.on("one", recording_handler("one", "1"));
  flow.on("two", recording_handler("two", "2"));
  flow.on("three", recording_handler("three", "3"));

  let ctx = FlowContext::new(TallyContext::default());
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, FlowOutcome::Completed);
  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.trail, "123");
  assert_eq!(guard.steps_executed, vec!["one", "two", "three"]);
}

#[tokio::test]
#[serial]
async fn phases_run_before_on_after() {
  setup_tracing();
  let mut flow = Flow::<TallyContext, TestError>::new("phases", &[("only", false, None)]);
  flow.after("only", recording_handler("after", "A"));
  flow.on("only", recording_handler("on", "O"));
  flow.before("only", recording_handler("before", "B"));

  let ctx = FlowContext::new(TallyContext::default());
  flow.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().trail, "BOA");
}

#[tokio::test]
#[serial]
async fn halt_reports_the_step_and_skips_the_rest() {
  setup_tracing();
  let mut flow = Flow::<TallyContext, TestError>::new(
    "halting",
    &[("first", false, None), ("gate", false, None), ("never", false, None)],
  );
  flow.on("first", recording_handler("first", "F"));
  flow.on("gate", recording_handler("gate", "G"));
  flow.after("gate", recording_handler("gate_after", "X"));
  flow.on("never", recording_handler("never", "N"));

  let ctx = FlowContext::new(TallyContext {
    halt_at: Some("gate".to_string()),
    ..Default::default()
  });
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome.halted_at(), Some("gate"));
  assert!(!outcome.is_completed());
  assert_eq!(ctx.read().trail, "FG");
}

#[tokio::test]
#[serial]
async fn handler_error_is_returned_unchanged() {
  setup_tracing();
  let mut flow = Flow::<TallyContext, TestError>::new(
    "failing",
    &[("good", false, None), ("bad", false, None), ("later", false, None)],
  );
  flow.on("good", recording_handler("good", "G"));
  flow.on("bad", failing_handler("bad", "boom"));
  flow.on("later", recording_handler("later", "L"));

  let ctx = FlowContext::new(TallyContext::default());
  let err = flow.run(ctx.clone()).await.unwrap_err();

  assert_eq!(err, TestError::Handler("boom".to_string()));
  assert_eq!(ctx.read().steps_executed, vec!["good", "bad"]);
}

#[tokio::test]
#[serial]
async fn skip_condition_is_evaluated_against_current_state() {
  setup_tracing();
  let mut flow = Flow::<TallyContext, TestError>::new(
    "skipping",
    &[
      ("one", false, None),
      ("skipped", false, skip_when(|data: &TallyContext| data.counter > 0)),
      ("three", false, None),
    ],
  );
  flow.on("one", recording_handler("one", "1"));
  flow.on("skipped", recording_handler("skipped", "S"));
  flow.on("three", recording_handler("three", "3"));

  let ctx = FlowContext::new(TallyContext::default());
  flow.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().steps_executed, vec!["one", "three"]);
}

#[tokio::test]
#[serial]
async fn optional_step_without_handlers_is_skipped() {
  setup_tracing();
  let mut flow = Flow::<TallyContext, TestError>::new("optional", &[("maybe", true, None), ("real", false, None)]);
  flow.on("real", recording_handler("real", "R"));

  let ctx = FlowContext::new(TallyContext::default());
  assert_eq!(flow.run(ctx.clone()).await.unwrap(), FlowOutcome::Completed);
  assert_eq!(ctx.read().trail, "R");
}

#[tokio::test]
#[serial]
async fn closures_returning_boxed_futures_are_accepted() {
  setup_tracing();
  let mut flow = Flow::<TallyContext, TestError>::new("closures", &[("inline", false, None)]);
  flow.on("inline", |ctx: FlowContext<TallyContext>| {
    Box::pin(async move {
      ctx.write().counter = 42;
      Ok::<_, TestError>(StepControl::Continue)
    })
  });

  let ctx = FlowContext::new(TallyContext::default());
  flow.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().counter, 42);
}
