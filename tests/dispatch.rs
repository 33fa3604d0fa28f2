//! Dispatcher behavior against real loopback HTTP targets

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use vigil::execution::{
    DEFAULT_TIMEOUT, DispatchError, Dispatcher, EndpointSpec, Method, REQUEST_ID_PREFIX, Status,
    TargetDefinition,
};
use vigil_testkit::{MockTarget, unreachable_url};

#[tokio::test]
async fn all_endpoints_matching_passes() {
    let target = MockTarget::new()
        .route("/home", 200)
        .route("/healthz", 200)
        .start()
        .await
        .unwrap();

    let definition = TargetDefinition::new(
        target.url(),
        vec![
            EndpointSpec::get("/home", 200),
            EndpointSpec::get("/healthz", 200),
        ],
    );

    let result = Dispatcher::new().dispatch(definition).await.unwrap();

    assert!(result.request_id.starts_with(REQUEST_ID_PREFIX));
    assert_eq!(result.base_url, target.url());
    assert_eq!(result.status, Status::Pass);
    assert_eq!(result.results.len(), 2);
    assert!(result.results.iter().all(|r| r.status == Status::Pass));
    assert_eq!(result.results[0].path, "/home");
    assert_eq!(result.results[1].path, "/healthz");
    assert_eq!(target.hits("/home"), 1);
    assert_eq!(target.hits("/healthz"), 1);
}

#[tokio::test]
async fn status_mismatch_fails_without_error() {
    let target = MockTarget::new()
        .route("/index", 200)
        .route("/will-fail", 400)
        .start()
        .await
        .unwrap();

    let definition = TargetDefinition::new(
        target.url(),
        vec![
            EndpointSpec::get("/index", 200),
            EndpointSpec::get("/will-fail", 200),
        ],
    );

    let result = Dispatcher::new().dispatch(definition).await.unwrap();

    assert_eq!(result.status, Status::Fail);
    assert_eq!(result.passed_count(), 1);
    assert_eq!(result.failed_count(), 1);

    let failed = &result.results[1];
    assert_eq!(failed.path, "/will-fail");
    assert_eq!(failed.expected_status, 200);
    assert_eq!(failed.actual_status, 400);
    assert_eq!(failed.status, Status::Fail);
}

#[tokio::test]
async fn expected_error_status_passes() {
    let target = MockTarget::new().route("/missing", 404).start().await.unwrap();

    let definition =
        TargetDefinition::new(target.url(), vec![EndpointSpec::get("/missing", 404)]);

    let result = Dispatcher::new().dispatch(definition).await.unwrap();
    assert_eq!(result.status, Status::Pass);
    assert_eq!(result.results[0].actual_status, 404);
}

#[tokio::test]
async fn unreachable_target_is_an_error() {
    let url = unreachable_url().await.unwrap();
    let definition = TargetDefinition::new(&url, vec![EndpointSpec::get("/healthz", 200)]);

    let err = Dispatcher::new().dispatch(definition).await.unwrap_err();

    let failures = err.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, "/healthz");
    assert!(err.to_string().contains("/healthz"));
    assert!(err.to_string().starts_with("failed to make 1 of 1 requests"));
}

#[tokio::test]
async fn one_transport_failure_voids_the_run() {
    let target = MockTarget::new()
        .route("/fast", 200)
        .route("/mismatch", 500)
        .route_with_delay("/hang", 200, Duration::from_secs(5))
        .start()
        .await
        .unwrap();

    let definition = TargetDefinition::new(
        target.url(),
        vec![
            EndpointSpec::get("/fast", 200),
            EndpointSpec::get("/hang", 200),
            EndpointSpec::get("/mismatch", 200),
        ],
    )
    .with_timeout_seconds(1);

    let err = Dispatcher::new().dispatch(definition).await.unwrap_err();

    match &err {
        DispatchError::Transport {
            request_id,
            total,
            failures,
        } => {
            assert!(request_id.starts_with(REQUEST_ID_PREFIX));
            assert_eq!(*total, 3);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].index, 1);
            assert_eq!(failures[0].method, Method::Get);
            assert_eq!(failures[0].path, "/hang");
        }
        other => panic!("expected transport error, got {other:?}"),
    }

    // the other probes still ran
    assert_eq!(target.hits("/fast"), 1);
    assert_eq!(target.hits("/mismatch"), 1);
}

#[tokio::test]
async fn every_transport_failure_is_reported() {
    let url = unreachable_url().await.unwrap();
    let definition = TargetDefinition::new(
        &url,
        vec![
            EndpointSpec::get("/a", 200),
            EndpointSpec::new("/b", Method::Post, 201),
            EndpointSpec::new("/c", Method::Delete, 204),
        ],
    );

    let err = Dispatcher::new().dispatch(definition).await.unwrap_err();

    let paths: Vec<&str> = err.failures().iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["/a", "/b", "/c"]);

    let message = err.to_string();
    assert!(message.starts_with("failed to make 3 of 3 requests"));
    assert!(message.contains("GET /a"));
    assert!(message.contains("POST /b"));
    assert!(message.contains("DELETE /c"));
}

#[tokio::test]
async fn default_timeout_applies_without_override() {
    let dispatcher = Dispatcher::new();
    assert_eq!(dispatcher.default_timeout(), DEFAULT_TIMEOUT);
    assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(5));

    // slower than a one second budget, well inside the five second default
    let target = MockTarget::new()
        .route_with_delay("/slow", 200, Duration::from_millis(1500))
        .start()
        .await
        .unwrap();

    let definition = TargetDefinition::new(target.url(), vec![EndpointSpec::get("/slow", 200)]);
    assert_eq!(definition.timeout_or(dispatcher.default_timeout()), DEFAULT_TIMEOUT);

    let result = dispatcher.dispatch(definition).await.unwrap();
    assert_eq!(result.status, Status::Pass);
}

#[tokio::test]
async fn configured_default_timeout_is_used() {
    let target = MockTarget::new()
        .route_with_delay("/slow", 200, Duration::from_secs(3))
        .start()
        .await
        .unwrap();

    let dispatcher = Dispatcher::new().with_default_timeout(Duration::from_millis(300));
    let definition = TargetDefinition::new(target.url(), vec![EndpointSpec::get("/slow", 200)]);

    let start = Instant::now();
    let err = dispatcher.dispatch(definition).await.unwrap_err();

    assert!(matches!(err, DispatchError::Transport { .. }));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn default_timeout_bounds_every_endpoint() {
    let target = MockTarget::new()
        .route_with_delay("/slow-a", 200, Duration::from_secs(3))
        .route_with_delay("/slow-b", 200, Duration::from_secs(3))
        .start()
        .await
        .unwrap();

    // no max_timeout_seconds, so the dispatcher default applies to each endpoint
    let definition = TargetDefinition::new(
        target.url(),
        vec![
            EndpointSpec::get("/slow-a", 200),
            EndpointSpec::get("/slow-b", 200),
        ],
    );
    assert!(definition.max_timeout_seconds.is_none());

    let dispatcher = Dispatcher::new().with_default_timeout(Duration::from_millis(300));
    let start = Instant::now();
    let err = dispatcher.dispatch(definition).await.unwrap_err();

    let paths: Vec<&str> = err.failures().iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["/slow-a", "/slow-b"]);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn results_follow_input_order() {
    let target = MockTarget::new()
        .route_with_delay("/first", 200, Duration::from_millis(300))
        .route_with_delay("/second", 201, Duration::from_millis(150))
        .route("/third", 202)
        .start()
        .await
        .unwrap();

    let definition = TargetDefinition::new(
        target.url(),
        vec![
            EndpointSpec::get("/first", 200),
            EndpointSpec::get("/second", 201),
            EndpointSpec::get("/third", 202),
        ],
    );

    let result = Dispatcher::new().dispatch(definition).await.unwrap();

    let observed: Vec<(&str, u16)> = result
        .results
        .iter()
        .map(|r| (r.path.as_str(), r.actual_status))
        .collect();
    assert_eq!(
        observed,
        vec![("/first", 200), ("/second", 201), ("/third", 202)]
    );
}

#[tokio::test]
async fn probes_run_concurrently() {
    let delay = Duration::from_millis(400);
    let target = MockTarget::new()
        .route_with_delay("/a", 200, delay)
        .route_with_delay("/b", 200, delay)
        .route_with_delay("/c", 200, delay)
        .route_with_delay("/d", 200, delay)
        .start()
        .await
        .unwrap();

    let endpoints = ["/a", "/b", "/c", "/d"]
        .into_iter()
        .map(|p| EndpointSpec::get(p, 200))
        .collect();

    let start = Instant::now();
    let result = Dispatcher::new()
        .dispatch(TargetDefinition::new(target.url(), endpoints))
        .await
        .unwrap();

    assert_eq!(result.status, Status::Pass);
    assert!(start.elapsed() < delay * 3);
    assert!(target.peak_in_flight() > 1);
}

#[tokio::test]
async fn concurrency_cap_bounds_in_flight_probes() {
    let mut mock = MockTarget::new();
    let mut endpoints = Vec::new();
    for i in 0..8 {
        let path = format!("/item/{i}");
        mock = mock.route_with_delay(&path, 200, Duration::from_millis(100));
        endpoints.push(EndpointSpec::get(path, 200));
    }
    let target = mock.start().await.unwrap();

    let result = Dispatcher::new()
        .with_max_concurrency(Some(2))
        .dispatch(TargetDefinition::new(target.url(), endpoints))
        .await
        .unwrap();

    assert_eq!(result.results.len(), 8);
    assert_eq!(result.status, Status::Pass);
    for (i, outcome) in result.results.iter().enumerate() {
        assert_eq!(outcome.path, format!("/item/{i}"));
    }
    assert!(target.peak_in_flight() <= 2);
    assert_eq!(target.total_hits(), 8);
}

#[tokio::test]
async fn methods_are_sent_as_declared() {
    let target = MockTarget::new()
        .route("/items", 201)
        .route("/items/1", 204)
        .start()
        .await
        .unwrap();

    let definition = TargetDefinition::new(
        target.url(),
        vec![
            EndpointSpec::new("/items", Method::Post, 201),
            EndpointSpec::new("/items/1", Method::Delete, 204),
        ],
    );

    let result = Dispatcher::new().dispatch(definition).await.unwrap();
    assert_eq!(result.status, Status::Pass);

    let mut methods: Vec<(String, String)> = target
        .requests()
        .into_iter()
        .map(|r| (r.path, r.method))
        .collect();
    methods.sort();
    assert_eq!(
        methods,
        vec![
            ("/items".to_string(), "POST".to_string()),
            ("/items/1".to_string(), "DELETE".to_string()),
        ]
    );
}

#[tokio::test]
async fn base_path_prefix_is_kept() {
    let target = MockTarget::new().route("/api/v1/status", 200).start().await.unwrap();

    let definition = TargetDefinition::new(
        format!("{}/api/v1/", target.url()),
        vec![EndpointSpec::get("status", 200)],
    );

    let result = Dispatcher::new().dispatch(definition).await.unwrap();
    assert_eq!(result.status, Status::Pass);
    assert_eq!(target.hits("/api/v1/status"), 1);
}

#[tokio::test]
async fn cancellation_aborts_slow_run() {
    let target = MockTarget::new()
        .route("/fast", 200)
        .route_with_delay("/slow", 200, Duration::from_secs(4))
        .start()
        .await
        .unwrap();

    let definition = TargetDefinition::new(
        target.url(),
        vec![
            EndpointSpec::get("/fast", 200),
            EndpointSpec::get("/slow", 200),
        ],
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = Dispatcher::new()
        .dispatch_with_cancel(definition, cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Cancelled { .. }));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn invalid_definition_sends_nothing() {
    let target = MockTarget::new().route("/", 200).start().await.unwrap();

    let definition = TargetDefinition::new(target.url(), vec![EndpointSpec::get("/", 200)])
        .with_timeout_seconds(0);

    let err = Dispatcher::new().dispatch(definition).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(target.total_hits(), 0);
}
