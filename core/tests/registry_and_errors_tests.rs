// core/tests/registry_and_errors_tests.rs
mod common;

use common::*;
use serial_test::serial;
use storefront_flow::{Flow, FlowContext, FlowError, FlowOutcome, FlowRegistry, StepControl};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct LabelContext {
  label: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct CountContext {
  count: i32,
}

#[tokio::test]
#[serial]
async fn registry_dispatches_by_context_type() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut labels = Flow::<LabelContext, TestError>::new("labels", &[("label", false, None)]);
  labels.on("label", |ctx: FlowContext<LabelContext>| {
    Box::pin(async move {
      ctx.write().label = "labelled".to_string();
      Ok::<_, FlowError>(StepControl::Continue)
    })
  });
  registry.register(labels);

  let mut counts = Flow::<CountContext, TestError>::new("counts", &[("count", false, None)]);
  counts.on("count", |ctx: FlowContext<CountContext>| {
    Box::pin(async move {
      ctx.write().count = 7;
      Ok::<_, FlowError>(StepControl::Continue)
    })
  });
  registry.register(counts);

  assert!(registry.is_registered::<LabelContext>());
  assert!(registry.is_registered::<CountContext>());

  let label_ctx = FlowContext::new(LabelContext::default());
  assert_eq!(registry.run(label_ctx.clone()).await.unwrap(), FlowOutcome::Completed);
  assert_eq!(label_ctx.read().label, "labelled");

  let count_ctx = FlowContext::new(CountContext::default());
  registry.run(count_ctx.clone()).await.unwrap();
  assert_eq!(count_ctx.snapshot(), CountContext { count: 7 });
}

#[tokio::test]
#[serial]
async fn unregistered_context_type_is_an_error() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  #[derive(Default)]
  struct Orphan;

  let err = registry.run(FlowContext::new(Orphan)).await.unwrap_err();
  match err {
    TestError::Flow(s) => {
      assert!(s.contains("NotRegistered"));
      assert!(s.contains("Orphan"));
    }
    other => panic!("expected NotRegistered, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn handler_errors_surface_through_the_registry() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();
  let mut flow = Flow::<LabelContext, TestError>::new("fails", &[("fail", false, None)]);
  flow.on("fail", |_ctx: FlowContext<LabelContext>| {
    Box::pin(async move { Err::<StepControl, _>(TestError::Handler("nope".to_string())) })
  });
  registry.register(flow);

  let err = registry.run(FlowContext::new(LabelContext::default())).await.unwrap_err();
  assert_eq!(err, TestError::Handler("nope".to_string()));
}

#[tokio::test]
#[serial]
async fn required_step_without_handlers_fails_with_handler_missing() {
  setup_tracing();
  let flow = Flow::<TallyContext, TestError>::new("empty", &[("missing", false, None)]);
  let err = flow.run(FlowContext::new(TallyContext::default())).await.unwrap_err();
  match err {
    TestError::Flow(s) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("missing"));
    }
    other => panic!("expected HandlerMissing, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn flow_error_can_be_the_handler_error_type() {
  setup_tracing();
  let registry = FlowRegistry::<FlowError>::default();
  let mut flow = Flow::<CountContext, FlowError>::new("plain", &[("task", false, None)]);
  flow.on("task", |_ctx: FlowContext<CountContext>| {
    Box::pin(async move { Err::<StepControl, _>(anyhow::anyhow!("wrapped failure")) })
  });
  registry.register(flow);

  let err = registry.run(FlowContext::new(CountContext::default())).await.unwrap_err();
  assert!(matches!(err, FlowError::Handler { .. }));
  assert!(err.to_string().contains("wrapped failure"));
}

#[test]
fn context_clones_share_state() {
  let ctx = FlowContext::new(CountContext::default());
  let other = ctx.clone();
  other.write().count = 3;
  assert_eq!(ctx.with(|c| c.count), 3);

  let guard = ctx.read();
  assert!(other.try_write().is_none());
  drop(guard);
  assert!(other.try_write().is_some());
}
