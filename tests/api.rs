//! End-to-end: client -> API server -> dispatcher -> mock target

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use vigil::api::{ApiState, serve};
use vigil::auth::{JwtConfig, generate_token};
use vigil::client::{ClientError, VigilClient};
use vigil::execution::{Dispatcher, EndpointSpec, Method, Status, TargetDefinition};
use vigil::store::{InMemoryStore, StoredResult};
use vigil_testkit::{MockTarget, unreachable_url};

const SECRET: &str = "integration-secret";

struct Service {
    url: String,
    state: ApiState,
    shutdown: CancellationToken,
}

impl Drop for Service {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn start_service(jwt: Option<JwtConfig>) -> Service {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let shutdown = CancellationToken::new();

    let state = ApiState::new(Dispatcher::new(), Arc::new(InMemoryStore::new(10)))
        .with_jwt(jwt)
        .with_environment("test")
        .with_shutdown(shutdown.clone());

    tokio::spawn(serve(listener, state.clone(), shutdown.clone()));

    Service {
        url,
        state,
        shutdown,
    }
}

/// Store writes happen in the background after the response
async fn wait_for_result(client: &VigilClient, request_id: &str) -> StoredResult {
    for _ in 0..50 {
        match client.result(request_id).await {
            Ok(stored) => return stored,
            Err(ClientError::Api { status: 404, .. }) => {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    panic!("result {request_id} was never stored");
}

#[tokio::test]
async fn run_store_and_fetch() {
    let service = start_service(None).await;
    let target = MockTarget::new()
        .route("/index", 200)
        .route("/will-fail", 400)
        .start()
        .await
        .unwrap();

    let client = VigilClient::new(&service.url).unwrap();
    let definition = TargetDefinition::new(
        target.url(),
        vec![
            EndpointSpec::get("/index", 200),
            EndpointSpec::get("/will-fail", 200),
        ],
    );

    let report = client.run(&definition).await.unwrap();
    assert_eq!(report.status, Status::Fail);
    assert_eq!(report.results[1].actual_status, 400);

    let stored = wait_for_result(&client, &report.request_id).await;
    assert_eq!(stored.user_id, "anonymous");
    assert_eq!(stored.status, Status::Fail);
    assert_eq!(stored.results, report.results);
    assert_eq!(stored.metadata.endpoint_count, 2);
    assert_eq!(stored.metadata.failed_count, 1);

    let history = client.history(5).await.unwrap();
    assert_eq!(history.count, 1);
    assert_eq!(history.results[0].request_id, report.request_id);

    let stats = service.state.stats();
    assert_eq!(stats.runs_total, 1);
    assert_eq!(stats.runs_failed, 1);
    assert_eq!(stats.probes_total, 2);
}

#[tokio::test]
async fn history_is_newest_first() {
    let service = start_service(None).await;
    let target = MockTarget::new().route("/", 200).start().await.unwrap();
    let client = VigilClient::new(&service.url).unwrap();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let report = client
            .run(&TargetDefinition::new(
                target.url(),
                vec![EndpointSpec::get("/", 200)],
            ))
            .await
            .unwrap();
        wait_for_result(&client, &report.request_id).await;
        ids.push(report.request_id);
    }

    let history = client.history(2).await.unwrap();
    let listed: Vec<&str> = history
        .results
        .iter()
        .map(|r| r.request_id.as_str())
        .collect();
    assert_eq!(listed, vec![ids[2].as_str(), ids[1].as_str()]);
}

#[tokio::test]
async fn transport_failure_is_a_server_error() {
    let service = start_service(None).await;
    let client = VigilClient::new(&service.url).unwrap();
    let url = unreachable_url().await.unwrap();

    let err = client
        .run(&TargetDefinition::new(
            &url,
            vec![EndpointSpec::new("/orders", Method::Post, 201)],
        ))
        .await
        .unwrap_err();

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("POST /orders"), "message: {message}");
        }
        other => panic!("expected API error, got {other:?}"),
    }

    assert_eq!(service.state.stats().runs_errored, 1);
    assert_eq!(client.history(10).await.unwrap().count, 0);
}

#[tokio::test]
async fn invalid_definition_is_a_bad_request() {
    let service = start_service(None).await;
    let client = VigilClient::new(&service.url).unwrap();

    let err = client
        .run(&TargetDefinition::new("not a url", vec![EndpointSpec::get("/", 200)]))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 400, .. }));
}

#[tokio::test]
async fn authentication_is_enforced() {
    let jwt = JwtConfig::new(SECRET);
    let service = start_service(Some(jwt.clone())).await;
    let target = MockTarget::new().route("/healthz", 200).start().await.unwrap();
    let definition =
        TargetDefinition::new(target.url(), vec![EndpointSpec::get("/healthz", 200)]);

    let anonymous = VigilClient::new(&service.url).unwrap();
    let err = anonymous.run(&definition).await.unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Authorization header required");
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert_eq!(target.total_hits(), 0);

    let token = generate_token("ops-team", Some("ops@example.com"), &jwt).unwrap();
    let client = VigilClient::new(&service.url).unwrap().with_token(token);
    let report = client.run(&definition).await.unwrap();
    assert_eq!(report.status, Status::Pass);

    let stored = wait_for_result(&client, &report.request_id).await;
    assert_eq!(stored.user_id, "ops-team");

    // another user cannot see it
    let other = generate_token("someone-else", None, &jwt).unwrap();
    let other_client = VigilClient::new(&service.url).unwrap().with_token(other);
    assert!(matches!(
        other_client.result(&report.request_id).await,
        Err(ClientError::Api { status: 404, .. })
    ));
}

#[tokio::test]
async fn health_check() {
    let service = start_service(None).await;
    let client = VigilClient::new(&service.url)
        .unwrap()
        .with_timeout(Duration::from_secs(2));

    let health = client.health().await.unwrap();
    assert!(health.is_healthy());
}

#[tokio::test]
async fn shutdown_cancels_in_flight_runs() {
    let service = start_service(None).await;
    let target = MockTarget::new()
        .route_with_delay("/slow", 200, Duration::from_secs(4))
        .start()
        .await
        .unwrap();
    let client = VigilClient::new(&service.url).unwrap();
    let definition = TargetDefinition::new(target.url(), vec![EndpointSpec::get("/slow", 200)]);

    let shutdown = service.shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.cancel();
    });

    let err = client.run(&definition).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 503, .. }));
}
