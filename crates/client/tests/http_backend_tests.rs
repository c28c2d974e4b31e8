//! Integration tests for the HTTP backend against a mock server.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobtrack_client::api::{ApiError, HealthComponent, HttpBackend, JobBackend};
use jobtrack_client::config::ClientConfig;
use jobtrack_client::submitter::{SubmissionError, Submitter};
use jobtrack_client::tracker::{Tracker, TrackerPhase};
use jobtrack_core::handle::JobHandle;
use jobtrack_core::request::JobRequest;
use jobtrack_core::state::JobState;

fn backend_for(server: &MockServer) -> HttpBackend {
    let config = ClientConfig::default().with_base_url(&format!("{}/", server.uri()));
    HttpBackend::new(&config).expect("client should build")
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// The request is posted wrapped in a `data` object and the `task_id` comes back as the handle.
#[tokio::test]
async fn submit_posts_wrapped_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/example/process-data"))
        .and(body_json(json!({
            "data": {"user_id": 101, "items": [42, 78, 134, 209], "note": "hello"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "abc-123",
            "state": "QUEUED",
            "message": "Data processing task queued with ID: abc-123",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let submitter = Submitter::new(Arc::new(backend_for(&server)));
    let request = JobRequest::new(101, vec![42, 78, 134, 209], Some("hello".into())).unwrap();

    let handle = submitter.submit(&request).await.unwrap();
    assert_eq!(handle.as_str(), "abc-123");
}

/// A 4xx body's `detail` becomes the rejection message.
#[tokio::test]
async fn submit_maps_detail_from_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/example/process-data"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "user_id is required"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let submitter = Submitter::new(Arc::new(backend_for(&server)));
    let request = JobRequest::new(0, vec![1], None).unwrap();

    let err = submitter.submit(&request).await.unwrap_err();
    assert_matches!(err, SubmissionError::Rejected { status: 400, ref detail } if detail == "user_id is required");
}

/// A 2xx answer with an empty `task_id` is not a usable submission.
#[tokio::test]
async fn submit_without_task_id_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/example/process-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": ""})))
        .mount(&server)
        .await;

    let submitter = Submitter::new(Arc::new(backend_for(&server)));
    let request = JobRequest::new(1, vec![1], None).unwrap();

    assert_matches!(
        submitter.submit(&request).await,
        Err(SubmissionError::InvalidResponse(_))
    );
}

/// A connection failure is reported as an unreachable backend.
#[tokio::test]
async fn submit_to_unreachable_backend_is_an_error() {
    // Port 9 (discard) is not expected to accept HTTP connections.
    let config = ClientConfig {
        request_timeout: Duration::from_secs(2),
        ..ClientConfig::default().with_base_url("http://127.0.0.1:9")
    };
    let submitter = Submitter::new(Arc::new(HttpBackend::new(&config).unwrap()));
    let request = JobRequest::new(1, vec![1], None).unwrap();

    assert_matches!(
        submitter.submit(&request).await,
        Err(SubmissionError::Unreachable(_))
    );
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Status responses map to a snapshot with a typed result.
#[tokio::test]
async fn fetch_status_reads_state_and_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/example/task/abc-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "abc-123",
            "state": "SUCCESS",
            "message": "Task completed successfully.",
            "result": {
                "task_id": "abc-123",
                "status": "SUCCESS",
                "processed_items": 1,
                "result_message": "Processed 1 items"
            },
            "error": null
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let response = backend
        .fetch_status(&JobHandle::parse("abc-123").unwrap())
        .await
        .unwrap();
    let snapshot = response.into_snapshot(chrono::Utc::now());

    assert_eq!(snapshot.state, JobState::Success);
    let result = snapshot.processed_result().expect("typed result");
    assert_eq!(result.result_message, "Processed 1 items");
}

/// Reserved characters in a task id stay inside its path segment.
#[tokio::test]
async fn fetch_status_encodes_task_id_as_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/example/task/job%2F1%3Fx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "STARTED"})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let response = backend
        .fetch_status(&JobHandle::parse("job/1?x").unwrap())
        .await
        .unwrap();
    assert_eq!(response.state, "STARTED");
}

/// A non-2xx status answer is an error carrying the backend's detail.
#[tokio::test]
async fn fetch_status_non_2xx_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/example/task/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Invalid task_id"})))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend
        .fetch_status(&JobHandle::parse("missing").unwrap())
        .await
        .unwrap_err();

    assert_matches!(err, ApiError::Status { status: 404, .. });
    assert_eq!(err.detail().as_deref(), Some("Invalid task_id"));
}

/// The tracker settles on a FAILURE from a real HTTP backend after one fetch.
#[tokio::test]
async fn tracker_settles_against_http_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/example/task/abc-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "FAILURE",
            "message": "Task failed.",
            "error": "boom"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::default()
        .with_base_url(&server.uri())
        .with_poll_interval(Duration::from_millis(50));
    let mut tracker = Tracker::new(Arc::new(HttpBackend::new(&config).unwrap()), &config);

    tracker.start_session(JobHandle::parse("abc-123").unwrap());
    let settled = tokio::time::timeout(Duration::from_secs(5), tracker.wait_settled())
        .await
        .expect("tracker should settle");

    assert_eq!(settled.phase, TrackerPhase::Settled);
    assert_eq!(settled.error_message(), Some("boom"));

    // Give a stray poll the chance to show up before `expect(1)` is verified on drop.
    tokio::time::sleep(Duration::from_millis(200)).await;
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// An unhealthy component is a successful probe, not an error.
#[tokio::test]
async fn health_reports_unhealthy_component_without_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health/celery"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"detail": "No Celery workers responding"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "service": "api"})))
        .mount(&server)
        .await;

    let backend = backend_for(&server);

    let workers = backend.health(HealthComponent::Workers).await.unwrap();
    assert!(!workers.healthy);
    assert_eq!(workers.status_code, 503);
    assert_eq!(workers.body["detail"], "No Celery workers responding");

    let api = backend.health(HealthComponent::Api).await.unwrap();
    assert!(api.healthy);
    assert_eq!(api.component, "api");
}

/// Probing an unreachable backend still yields one report per component.
#[tokio::test]
async fn health_all_reports_unreachable_components() {
    let config = ClientConfig {
        request_timeout: Duration::from_secs(2),
        ..ClientConfig::default().with_base_url("http://127.0.0.1:9")
    };
    let backend = HttpBackend::new(&config).unwrap();

    let reports = backend.health_all(&HealthComponent::ALL).await;

    assert_eq!(reports.len(), 4);
    let names: Vec<&str> = reports.iter().map(|r| r.component).collect();
    assert_eq!(names, vec!["api", "db", "redis", "celery"]);
    for report in &reports {
        assert!(!report.healthy);
        assert_eq!(report.status_code, 0);
        assert!(report.body["detail"].is_string());
    }
}
