//! End-to-end supervisor runs against scripted collaborators.

use std::sync::Arc;
use std::time::Duration;

use foreman::adapters::mock::{
    BuildOutcome, CodegenOutcome, FixedClock, RecordingVcs, ScriptedBuildRunner,
    ScriptedCodeGenerator,
};
use foreman::context::Collaborators;
use foreman::errors::GraphError;
use foreman::spec::{CompareOp, QualityRule, ServiceKind};
use foreman::store::TaskState;
use foreman::supervisor::{CollectingSink, RunConfig, Supervisor};
use foreman::unit::Unit;

struct Harness {
    codegen: Arc<ScriptedCodeGenerator>,
    builder: Arc<ScriptedBuildRunner>,
    vcs: Arc<RecordingVcs>,
    sink: Arc<CollectingSink>,
    collaborators: Collaborators,
}

impl Harness {
    fn new() -> Self {
        let codegen = Arc::new(ScriptedCodeGenerator::new());
        let builder = Arc::new(ScriptedBuildRunner::new());
        let vcs = Arc::new(RecordingVcs::new());
        let collaborators = Collaborators {
            clock: Arc::new(FixedClock::default()),
            codegen: Arc::clone(&codegen) as _,
            builder: Arc::clone(&builder) as _,
            vcs: Arc::clone(&vcs) as _,
        };
        Self { codegen, builder, vcs, sink: Arc::new(CollectingSink::new()), collaborators }
    }

    fn supervisor(&self, units: Vec<Unit>, config: RunConfig) -> Supervisor {
        Supervisor::new(units, self.collaborators.clone(), config, self.sink.clone())
            .expect("valid graph")
    }
}

fn unit(name: &str, deps: &[&str]) -> Unit {
    Unit {
        name: name.to_string(),
        kind: ServiceKind::Backend,
        description: format!("Service {name}"),
        dependencies: deps.iter().map(ToString::to_string).collect(),
        quality_rules: vec![],
        build_command: None,
    }
}

fn gated_unit(name: &str, deps: &[&str], metric: &str, threshold: f64) -> Unit {
    Unit {
        quality_rules: vec![QualityRule {
            metric: metric.to_string(),
            op: CompareOp::Lt,
            threshold,
        }],
        ..unit(name, deps)
    }
}

#[tokio::test]
async fn happy_path_commits_every_unit_in_dependency_order() {
    let harness = Harness::new();
    let supervisor = harness.supervisor(
        vec![unit("api", &[]), unit("tts", &["api"]), unit("web", &["api"])],
        RunConfig::default(),
    );

    let summary = supervisor.run().await.unwrap();
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.blocked, 0);
    assert!(!summary.cancelled);
    assert!(summary.push_warnings.is_empty());

    let messages = harness.vcs.commit_messages();
    assert_eq!(messages.len(), 3);
    assert!(messages[0].starts_with("feat: complete api\n"));
    assert!(messages[1].starts_with("feat: complete tts\n"));
    assert!(messages[2].starts_with("feat: complete web\n"));
    assert_eq!(harness.vcs.pushed().len(), 3);

    for name in ["api", "tts", "web"] {
        assert_eq!(harness.codegen.calls_for(name), 1);
        assert_eq!(harness.builder.calls_for(name), 1);
    }
}

#[tokio::test]
async fn unit_lifecycle_emits_transitions_in_order() {
    let harness = Harness::new();
    let supervisor = harness.supervisor(vec![unit("api", &[])], RunConfig::default());
    supervisor.run().await.unwrap();

    let walked: Vec<TaskState> = harness
        .sink
        .events()
        .iter()
        .filter(|e| e.unit == "api")
        .map(|e| e.to)
        .collect();
    assert_eq!(
        walked,
        vec![
            TaskState::Ready,
            TaskState::InProgress,
            TaskState::Verifying,
            TaskState::Succeeded
        ]
    );
}

#[tokio::test]
async fn qa_failure_retries_with_feedback_until_the_gate_passes() {
    let harness = Harness::new();
    harness.builder.script(
        "tts",
        [
            BuildOutcome::passing_with_output("synthesis done\nmcd: 7.2", &[("mcd", 7.2)]),
            BuildOutcome::passing_with_output("synthesis done\nmcd: 6.5", &[("mcd", 6.5)]),
            BuildOutcome::passing_with_output("synthesis done\nmcd: 5.1", &[("mcd", 5.1)]),
        ],
    );
    let supervisor = harness.supervisor(
        vec![gated_unit("tts", &[], "mcd", 6.0)],
        RunConfig { max_retries: 3, ..RunConfig::default() },
    );

    let summary = supervisor.run().await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);

    // Two failed gates, so three implement calls; the retries carry
    // feedback, the first call does not.
    let calls = harness.codegen.calls();
    assert_eq!(calls.len(), 3);
    assert!(!calls[0].had_feedback);
    assert!(calls[1].had_feedback);
    assert!(calls[2].had_feedback);
    assert_eq!(harness.builder.calls_for("tts"), 3);

    // Exactly one commit, made only after the gate finally passed.
    let messages = harness.vcs.commit_messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Attempts: 3"));
    assert!(messages[0].contains("- mcd < 6"));
}

#[tokio::test]
async fn sibling_units_are_unaffected_by_one_unit_retrying() {
    let harness = Harness::new();
    harness.builder.script(
        "tts",
        [
            BuildOutcome::passing_with_output("mcd: 7.2", &[("mcd", 7.2)]),
            BuildOutcome::passing_with_output("mcd: 6.8", &[("mcd", 6.8)]),
            BuildOutcome::passing_with_output("mcd: 5.1", &[("mcd", 5.1)]),
        ],
    );
    let supervisor = harness.supervisor(
        vec![
            unit("api", &[]),
            gated_unit("tts", &["api"], "mcd", 6.0),
            unit("web", &["api"]),
        ],
        RunConfig { max_retries: 3, concurrency: 2, ..RunConfig::default() },
    );

    let summary = supervisor.run().await.unwrap();
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.blocked, 0);

    assert_eq!(harness.codegen.calls_for("api"), 1);
    assert_eq!(harness.codegen.calls_for("tts"), 3);
    assert_eq!(harness.codegen.calls_for("web"), 1);
    assert_eq!(harness.vcs.commit_messages().len(), 3);
}

#[tokio::test]
async fn exhausted_retries_fail_the_unit_and_block_dependents() {
    let harness = Harness::new();
    harness.builder.script(
        "api",
        [
            BuildOutcome::build_failed("error: missing import"),
            BuildOutcome::build_failed("error: missing import"),
            BuildOutcome::build_failed("error: missing import"),
        ],
    );
    let supervisor = harness.supervisor(
        vec![unit("api", &[]), unit("web", &["api"]), unit("mobile", &["web"])],
        RunConfig { max_retries: 2, ..RunConfig::default() },
    );

    let summary = supervisor.run().await.unwrap();
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.blocked, 2);

    // max_retries = 2 means three implement calls total, then stop.
    assert_eq!(harness.codegen.calls_for("api"), 3);
    assert_eq!(harness.codegen.calls_for("web"), 0);
    assert_eq!(harness.codegen.calls_for("mobile"), 0);

    // Nothing was ever committed.
    assert!(harness.vcs.commit_messages().is_empty());

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].unit, "api");
    assert!(summary.failures[0].summary.contains("build/test failed"));
    assert!(summary.failures[0].summary.contains("missing import"));
}

#[tokio::test]
async fn missing_metric_counts_as_a_violation() {
    let harness = Harness::new();
    // Build passes but never reports the gated metric.
    harness.builder.script("tts", [BuildOutcome::passing(&[]), BuildOutcome::passing(&[])]);
    let supervisor = harness.supervisor(
        vec![gated_unit("tts", &[], "mcd", 6.0)],
        RunConfig { max_retries: 1, ..RunConfig::default() },
    );

    let summary = supervisor.run().await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].violations.len(), 1);
    assert_eq!(summary.failures[0].violations[0].observed, None);
    assert!(summary.failures[0].summary.contains("missing metric: mcd"));
}

#[tokio::test]
async fn codegen_call_failure_consumes_an_attempt() {
    let harness = Harness::new();
    harness
        .codegen
        .script("api", [CodegenOutcome::Fail("provider down".to_string())]);
    let supervisor = harness
        .supervisor(vec![unit("api", &[])], RunConfig { max_retries: 1, ..RunConfig::default() });

    let summary = supervisor.run().await.unwrap();
    assert_eq!(summary.succeeded, 1);

    let calls = harness.codegen.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].had_feedback);

    // The failed call was recorded as a Fixing transition.
    let fixing: Vec<String> = harness
        .sink
        .events()
        .iter()
        .filter(|e| e.to == TaskState::Fixing)
        .filter_map(|e| e.context.clone())
        .collect();
    assert_eq!(fixing.len(), 1);
    assert!(fixing[0].contains("implement call failed"));
    assert!(fixing[0].contains("provider down"));
}

#[tokio::test(start_paused = true)]
async fn timed_out_call_is_a_failed_attempt() {
    let harness = Harness::new();
    harness
        .codegen
        .script("api", [CodegenOutcome::Hang(Duration::from_secs(30))]);
    let supervisor = harness.supervisor(
        vec![unit("api", &[])],
        RunConfig {
            max_retries: 1,
            per_call_timeout: Duration::from_secs(5),
            ..RunConfig::default()
        },
    );

    let summary = supervisor.run().await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(harness.codegen.calls_for("api"), 2);

    let fixing: Vec<String> = harness
        .sink
        .events()
        .iter()
        .filter(|e| e.to == TaskState::Fixing)
        .filter_map(|e| e.context.clone())
        .collect();
    assert_eq!(fixing.len(), 1);
    assert!(fixing[0].contains("implement call timed out"));
}

#[tokio::test(start_paused = true)]
async fn slow_commit_does_not_stall_other_units_timers() {
    let harness = Harness::new();
    harness.vcs.delay_commits(Duration::from_secs(60));
    harness
        .codegen
        .script("web", [CodegenOutcome::Hang(Duration::from_secs(600))]);
    let supervisor = harness.supervisor(
        vec![unit("api", &[]), unit("web", &[])],
        RunConfig {
            concurrency: 2,
            max_retries: 1,
            per_call_timeout: Duration::from_secs(10),
            ..RunConfig::default()
        },
    );

    let summary = supervisor.run().await.unwrap();
    assert_eq!(summary.succeeded, 2);

    // While api's 60-second commit is in flight, web's hung implement
    // call must still time out at the 10-second mark and retry.
    assert_eq!(harness.codegen.calls_for("web"), 2);
    assert_eq!(harness.vcs.commit_messages().len(), 2);
}

#[tokio::test]
async fn push_failure_keeps_the_unit_succeeded_with_a_warning() {
    let harness = Harness::new();
    harness.vcs.fail_pushes();
    let supervisor = harness.supervisor(vec![unit("api", &[])], RunConfig::default());

    let summary = supervisor.run().await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.push_warnings.len(), 1);
    assert_eq!(summary.push_warnings[0].unit, "api");
    assert_eq!(harness.vcs.commit_messages().len(), 1);
    assert!(harness.vcs.pushed().is_empty());
}

#[tokio::test]
async fn skip_push_commits_locally_only() {
    let harness = Harness::new();
    let supervisor = harness.supervisor(
        vec![unit("api", &[])],
        RunConfig { skip_push: true, ..RunConfig::default() },
    );

    let summary = supervisor.run().await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert!(summary.push_warnings.is_empty());
    assert_eq!(harness.vcs.commit_messages().len(), 1);
    assert!(harness.vcs.pushed().is_empty());
}

#[tokio::test]
async fn cancelling_before_the_run_skips_every_unit() {
    let harness = Harness::new();
    let supervisor = harness
        .supervisor(vec![unit("api", &[]), unit("web", &["api"])], RunConfig::default());
    supervisor.cancel_flag().cancel();

    let summary = supervisor.run().await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(harness.codegen.calls(), vec![]);
}

#[tokio::test]
async fn cancellation_stops_new_work_and_abandons_the_commit() {
    let harness = Harness::new();
    harness
        .codegen
        .script("tts", [CodegenOutcome::Hang(Duration::from_millis(200))]);
    let supervisor = harness.supervisor(
        vec![unit("api", &[]), unit("tts", &["api"]), unit("web", &["tts"])],
        RunConfig::default(),
    );

    let cancel = supervisor.cancel_flag();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let summary = supervisor.run().await.unwrap();
    canceller.await.unwrap();

    assert!(summary.cancelled);
    // "api" finished before the signal; "tts" was mid-implement and is
    // failed at the commit boundary; "web" never started.
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.blocked + summary.skipped, 1);
    assert_eq!(harness.vcs.commit_messages().len(), 1);
    assert_eq!(harness.codegen.calls_for("web"), 0);
}

#[tokio::test]
async fn grace_period_expiry_fails_in_flight_units() {
    let harness = Harness::new();
    harness
        .codegen
        .script("api", [CodegenOutcome::Hang(Duration::from_secs(60))]);
    let supervisor = harness.supervisor(
        vec![unit("api", &[])],
        RunConfig { grace_period: Duration::from_millis(20), ..RunConfig::default() },
    );

    let cancel = supervisor.cancel_flag();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let summary = supervisor.run().await.unwrap();
    canceller.await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.failed, 1);
    assert!(summary.failures[0].summary.contains("grace period"));
    assert!(harness.vcs.commit_messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn grace_period_is_one_shared_deadline_across_workers() {
    let harness = Harness::new();
    harness
        .codegen
        .script("api", [CodegenOutcome::Hang(Duration::from_secs(8))]);
    harness
        .codegen
        .script("web", [CodegenOutcome::Hang(Duration::from_secs(600))]);
    let supervisor = harness.supervisor(
        vec![unit("api", &[]), unit("web", &[])],
        RunConfig {
            concurrency: 2,
            per_call_timeout: Duration::from_secs(1000),
            grace_period: Duration::from_secs(10),
            ..RunConfig::default()
        },
    );

    let cancel = supervisor.cancel_flag();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });

    let started = tokio::time::Instant::now();
    let summary = supervisor.run().await.unwrap();
    canceller.await.unwrap();
    let elapsed = started.elapsed();

    // api finishes inside the grace window; that must not grant web a
    // second full grace period on top of the first.
    assert!(summary.cancelled);
    assert!(elapsed < Duration::from_secs(15), "run took {elapsed:?}");
    assert_eq!(summary.failed, 2);
}

#[tokio::test(start_paused = true)]
async fn independent_units_run_in_parallel_when_allowed() {
    let harness = Harness::new();
    harness
        .codegen
        .script("api", [CodegenOutcome::Hang(Duration::from_secs(60))]);
    harness
        .codegen
        .script("web", [CodegenOutcome::Hang(Duration::from_secs(60))]);
    let supervisor = harness.supervisor(
        vec![unit("api", &[]), unit("web", &[])],
        RunConfig {
            concurrency: 2,
            per_call_timeout: Duration::from_secs(600),
            ..RunConfig::default()
        },
    );

    let started = tokio::time::Instant::now();
    let summary = supervisor.run().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(summary.succeeded, 2);
    // Sequential execution would take at least 120 virtual seconds.
    assert!(elapsed < Duration::from_secs(120), "run took {elapsed:?}");
    assert_eq!(harness.vcs.commit_messages().len(), 2);
}

#[tokio::test]
async fn unknown_dependency_refuses_to_schedule() {
    let harness = Harness::new();
    let err = Supervisor::new(
        vec![unit("api", &["ghost"])],
        harness.collaborators.clone(),
        RunConfig::default(),
        harness.sink.clone(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        GraphError::UnknownDependency { unit: "api".to_string(), dependency: "ghost".to_string() }
    );
    assert_eq!(harness.codegen.calls(), vec![]);
}

#[tokio::test]
async fn dependency_cycle_refuses_to_schedule() {
    let harness = Harness::new();
    let err = Supervisor::new(
        vec![unit("a", &["b"]), unit("b", &["a"])],
        harness.collaborators.clone(),
        RunConfig::default(),
        harness.sink.clone(),
    )
    .unwrap_err();
    assert!(matches!(err, GraphError::Cycle { .. }));
}
