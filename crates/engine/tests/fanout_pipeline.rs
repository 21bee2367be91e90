use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{Json, Router, extract::Path, http::StatusCode, routing::get};
use fanout_engine::{CallError, ExecutionContext, FanoutError, FieldCatalog, FieldError, FieldSource, TargetCaller, TargetRegistry, caller_fn};
use fanout_registry::{ConfigFormat, parse_config_str};
use fanout_types::{DeclaredShape, MergePolicy, PayloadKind, Target};
use serde_json::{Value, json};

fn users_field(shape: DeclaredShape) -> FieldSource {
    let registry = TargetRegistry::new([
        Target::new("primary", "https://primary.example.com"),
        Target::new("replica", "https://replica.example.com"),
        Target::new("archive", "https://archive.example.com"),
    ])
    .expect("registry");
    FieldSource::new("users", registry, shape, MergePolicy::default())
}

/// Caller answering from a fixed script keyed by target name.
struct ScriptedCaller {
    calls: AtomicUsize,
    delays_ms: Vec<(&'static str, u64)>,
    answers: Vec<(&'static str, Result<Value, u16>)>,
}

impl ScriptedCaller {
    fn new(answers: Vec<(&'static str, Result<Value, u16>)>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delays_ms: Vec::new(),
            answers,
        }
    }

    fn with_delays(mut self, delays_ms: Vec<(&'static str, u64)>) -> Self {
        self.delays_ms = delays_ms;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TargetCaller for ScriptedCaller {
    async fn call(&self, target: &Target, _context: &ExecutionContext) -> Result<Value, CallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((_, delay)) = self.delays_ms.iter().find(|(name, _)| *name == target.name) {
            tokio::time::sleep(Duration::from_millis(*delay)).await;
        }
        match self.answers.iter().find(|(name, _)| *name == target.name) {
            Some((_, Ok(value))) => Ok(value.clone()),
            Some((_, Err(status))) => Err(CallError::status(&target.name, *status, "upstream failure")),
            None => Ok(Value::Null),
        }
    }
}

#[tokio::test]
async fn unknown_target_is_rejected_before_any_call() {
    let caller = ScriptedCaller::new(vec![("primary", Ok(json!([])))]);
    let err = users_field(DeclaredShape::Collection)
        .resolve(Some(&json!(["primary", "ghost"])), &ExecutionContext::new(), &caller)
        .await
        .unwrap_err();

    match err.fanout() {
        Some(FanoutError::UnknownTarget(unknown)) => {
            assert_eq!(unknown.name, "ghost");
            assert_eq!(unknown.valid, vec!["primary", "replica", "archive"]);
        }
        other => panic!("expected unknown target, got {other:?}"),
    }
    assert_eq!(caller.calls(), 0);
}

#[tokio::test]
async fn one_failing_call_fails_the_whole_fan_out() {
    let caller = ScriptedCaller::new(vec![
        ("primary", Ok(json!([{"id": 1}]))),
        ("replica", Err(502)),
        ("archive", Ok(json!([{"id": 2}]))),
    ]);
    let err = users_field(DeclaredShape::Collection)
        .resolve(Some(&json!(["primary", "replica", "archive"])), &ExecutionContext::new(), &caller)
        .await
        .unwrap_err();

    match err.fanout() {
        Some(FanoutError::Dispatch(dispatch)) => {
            assert_eq!(dispatch.target, "replica");
            assert_eq!(dispatch.index, 1);
            assert_eq!(dispatch.total, 3);
            assert_eq!(dispatch.source, CallError::status("replica", 502, "upstream failure"));
        }
        other => panic!("expected dispatch failure, got {other:?}"),
    }
    assert!(err.to_string().contains("replica"), "{err}");
}

#[tokio::test]
async fn completion_order_does_not_change_the_result() {
    let answers = || {
        vec![
            ("primary", Ok(json!([{"id": "1", "name": "A"}, {"id": "2", "name": "B"}]))),
            ("replica", Ok(json!([{"id": "1", "name": "A2"}, {"id": "3", "name": "C"}]))),
        ]
    };
    let field = users_field(DeclaredShape::Collection);
    let selector = json!(["primary", "replica"]);

    let primary_first = ScriptedCaller::new(answers()).with_delays(vec![("replica", 30)]);
    let replica_first = ScriptedCaller::new(answers()).with_delays(vec![("primary", 30)]);

    let a = field.resolve(Some(&selector), &ExecutionContext::new(), &primary_first).await.unwrap();
    let b = field.resolve(Some(&selector), &ExecutionContext::new(), &replica_first).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(
        a,
        json!([{"id": "1", "name": "A2"}, {"id": "2", "name": "B"}, {"id": "3", "name": "C"}])
    );
}

#[tokio::test]
async fn incompatible_payloads_produce_no_result() {
    let caller = ScriptedCaller::new(vec![("primary", Ok(json!([{"id": 1}]))), ("replica", Ok(json!({"id": 1})))]);
    let err = users_field(DeclaredShape::Collection)
        .resolve(Some(&json!(["primary", "replica"])), &ExecutionContext::new(), &caller)
        .await
        .unwrap_err();

    match err.fanout() {
        Some(FanoutError::Incompatible(incompatible)) => {
            assert_eq!(incompatible.index, 1);
            assert_eq!(incompatible.expected, PayloadKind::Collection);
            assert_eq!(incompatible.observed, PayloadKind::Single);
        }
        other => panic!("expected incompatibility, got {other:?}"),
    }
}

#[tokio::test]
async fn absent_answers_are_skipped() {
    let caller = ScriptedCaller::new(vec![
        ("primary", Ok(Value::Null)),
        ("replica", Ok(json!({"profile": {"name": "Alice"}}))),
        ("archive", Ok(json!({"profile": {"bio": "Engineer"}}))),
    ]);
    let merged = users_field(DeclaredShape::Composite)
        .resolve(Some(&json!(["primary", "replica", "archive"])), &ExecutionContext::new(), &caller)
        .await
        .unwrap();
    assert_eq!(merged, json!({"profile": {"name": "Alice", "bio": "Engineer"}}));
}

#[tokio::test]
async fn shared_deadline_bounds_the_fan_out() {
    let caller = ScriptedCaller::new(vec![("primary", Ok(json!("a"))), ("replica", Ok(json!("b")))])
        .with_delays(vec![("replica", 2_000)]);
    let context = ExecutionContext::new().with_timeout(Duration::from_millis(50));

    let err = users_field(DeclaredShape::Scalar)
        .resolve(Some(&json!(["primary", "replica"])), &context, &caller)
        .await
        .unwrap_err();
    assert!(matches!(err.fanout(), Some(FanoutError::Timeout { targets: 2, .. })), "{err:?}");
}

#[tokio::test]
async fn cancelled_context_stops_the_fan_out() {
    let started = Arc::new(AtomicUsize::new(0));
    let caller = {
        let started = Arc::clone(&started);
        caller_fn(move |_target: Target, _| {
            let started = Arc::clone(&started);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(json!([]))
            }
        })
    };
    let context = ExecutionContext::new();
    let token = context.cancellation().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = users_field(DeclaredShape::Collection)
        .resolve(Some(&json!(["primary", "archive"])), &context, &caller)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        FieldError::Fanout {
            field: "users".to_string(),
            source: FanoutError::Cancelled { targets: 2 },
        }
    );
    assert_eq!(started.load(Ordering::SeqCst), 2);
}

async fn spawn_upstream(label: &'static str) -> String {
    let app = Router::new()
        .route(
            "/teams/{team}/users",
            get(move |Path(team): Path<String>| async move {
                Json(json!({
                    "data": {
                        "items": [
                            {"id": "1", "name": format!("{label}-one"), "team": team},
                            {"id": label, "name": label, "team": team}
                        ]
                    }
                }))
            }),
        )
        .route("/down/{team}", get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance window") }))
        .route(
            "/slow/{team}",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!([]))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let address = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve upstream");
    });
    format!("http://{address}")
}

async fn catalog_for(path: &str, timeout_ms: Option<u64>) -> FieldCatalog {
    let primary = spawn_upstream("primary").await;
    let replica = spawn_upstream("replica").await;
    let timeout = timeout_ms.map(|ms| format!("    timeoutMs: {ms}\n")).unwrap_or_default();
    let document = format!(
        "fields:\n  users:\n    shape: collection\n    path: {path}\n    listResponsePath: data.items\n{timeout}    targets:\n      - name: primary\n        address: {primary}\n      - name: replica\n        address: {replica}\n"
    );
    let config = parse_config_str(&document, ConfigFormat::Yaml).expect("config parses");
    FieldCatalog::from_config(&config).expect("catalog builds")
}

#[tokio::test]
async fn http_fan_out_merges_upstream_lists() {
    let catalog = catalog_for("/teams/{team}/users", None).await;
    let context = ExecutionContext::new().with_argument("team", json!("core"));

    let merged = catalog
        .resolve("users", Some(&json!(["primary", "replica"])), &context)
        .await
        .expect("fan-out succeeds");
    assert_eq!(
        merged,
        json!([
            {"id": "1", "name": "replica-one", "team": "core"},
            {"id": "primary", "name": "primary", "team": "core"},
            {"id": "replica", "name": "replica", "team": "core"}
        ])
    );

    let single = catalog.resolve("users", None, &context).await.expect("single target succeeds");
    assert_eq!(
        single,
        json!([
            {"id": "1", "name": "primary-one", "team": "core"},
            {"id": "primary", "name": "primary", "team": "core"}
        ])
    );
}

#[tokio::test]
async fn http_status_failure_names_the_target() {
    let catalog = catalog_for("/down/{team}", None).await;
    let context = ExecutionContext::new().with_argument("team", json!("core"));

    let err = catalog.resolve("users", Some(&json!("replica")), &context).await.unwrap_err();
    match err {
        FieldError::Call(CallError::Status { target, status, body_preview }) => {
            assert_eq!(target, "replica");
            assert_eq!(status, 503);
            assert_eq!(body_preview, "maintenance window");
        }
        other => panic!("expected unwrapped status error, got {other:?}"),
    }
}

#[tokio::test]
async fn configured_timeout_applies_without_context_deadline() {
    let catalog = catalog_for("/slow/{team}", Some(100)).await;
    let context = ExecutionContext::new().with_argument("team", json!("core"));

    let err = catalog
        .resolve("users", Some(&json!(["primary", "replica"])), &context)
        .await
        .unwrap_err();
    assert!(matches!(err.fanout(), Some(FanoutError::Timeout { .. })), "{err:?}");
}
