//! End-to-end pipeline tests

use crate::common::{page_url, page_with_images, requests_for, start_server, test_config, PNG};
use ripple_fetch::config::FailurePolicy;
use ripple_fetch::{Pipeline, RippleError, TaskError, TaskOutcome};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_downloads_every_image_within_ceiling() {
    let references = [
        "/img/ok/one.png?d=100ms",
        "/img/ok/two.png?d=100ms",
        "/img/ok/three.png?d=100ms",
        "/img/ok/four.png?d=100ms",
        "/img/ok/five.png?d=100ms",
    ];
    let server = start_server(&page_with_images(&references)).await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("imgs");

    let pipeline = Pipeline::new(test_config(page_url(&server), &dest)).unwrap();
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.downloaded, 5);
    assert_eq!(summary.peak_in_flight, 2);
    for name in ["one", "two", "three", "four", "five"] {
        let file = dest.join(format!("{}.png", name));
        assert_eq!(std::fs::read(&file).unwrap(), PNG, "{}", file.display());
    }
}

#[tokio::test]
async fn test_report_preserves_document_order() {
    let references = [
        "/img/ok/slow.png?d=300ms",
        "/img/ok/fast.png?d=10ms",
        "/img/ok/mid.png?d=100ms",
    ];
    let server = start_server(&page_with_images(&references)).await;
    let dir = TempDir::new().unwrap();

    let mut config = test_config(page_url(&server), dir.path());
    config.pool.max_concurrency = 3;
    let report = Pipeline::new(config).unwrap().run_report().await.unwrap();

    let labels: Vec<&str> = report.tasks.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(labels, references.to_vec());
    assert!(report.is_success());
}

#[tokio::test]
async fn test_fail_fast_cancels_slow_siblings() {
    let references = [
        "/img/ok/slow1.png?d=2s",
        "/img/ng/broken.png",
        "/img/ok/slow2.png?d=2s",
        "/img/ok/slow3.png?d=2s",
    ];
    let server = start_server(&page_with_images(&references)).await;
    let dir = TempDir::new().unwrap();

    let mut config = test_config(page_url(&server), dir.path());
    config.pool.max_concurrency = 4;
    config.attempt.timeout_ms = 5000;

    let started = Instant::now();
    let report = Pipeline::new(config).unwrap().run_report().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(matches!(
        report.tasks[1].outcome,
        TaskOutcome::Failure(TaskError::Status { status: 500, .. })
    ));
    for index in [0, 2, 3] {
        assert!(
            report.tasks[index].outcome.is_cancelled(),
            "{} was {:?}",
            report.tasks[index].label,
            report.tasks[index].outcome
        );
    }
    assert!(!dir.path().join("slow1.png").exists());
    assert!(!dir.path().join("slow1.png.part").exists());

    match report.into_result() {
        Err(RippleError::Task { reference, .. }) => assert_eq!(reference, "/img/ng/broken.png"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_collect_all_lets_siblings_finish() {
    let references = [
        "/img/ok/a.png?d=200ms",
        "/img/ng/broken.png",
        "/img/ok/b.png?d=200ms",
        "/img/ng/also-broken.png",
    ];
    let server = start_server(&page_with_images(&references)).await;
    let dir = TempDir::new().unwrap();

    let mut config = test_config(page_url(&server), dir.path());
    config.pool.max_concurrency = 4;
    config.pool.failure_policy = FailurePolicy::CollectAll;

    let report = Pipeline::new(config).unwrap().run_report().await.unwrap();

    assert!(report.tasks[0].outcome.is_success());
    assert!(report.tasks[2].outcome.is_success());
    assert_eq!(report.failures().count(), 2);
    assert_eq!(report.first_error().unwrap().label, "/img/ng/broken.png");
    assert!(dir.path().join("a.png").exists());
    assert!(dir.path().join("b.png").exists());
}

#[tokio::test]
async fn test_panicking_task_is_isolated() {
    let references = [
        "/img/ok/a.png?d=50ms",
        "/img/ok/doomed.png?panic=1",
        "/img/ok/b.png?d=50ms",
    ];
    let server = start_server(&page_with_images(&references)).await;
    let dir = TempDir::new().unwrap();

    let mut config = test_config(page_url(&server), dir.path());
    config.pool.failure_policy = FailurePolicy::CollectAll;

    let result = Pipeline::new(config).unwrap().run().await;

    match result {
        Err(RippleError::TaskPanicked { reference, message }) => {
            assert_eq!(reference, "/img/ok/doomed.png?panic=1");
            assert!(message.contains("doomed.png"), "{}", message);
        }
        other => panic!("expected a panic report, got {:?}", other),
    }
    assert!(dir.path().join("a.png").exists());
    assert!(dir.path().join("b.png").exists());
    assert!(requests_for(&server, "/img/ok/doomed.png").await.is_empty());
}

#[tokio::test]
async fn test_timeout_recovery_through_pipeline() {
    let references = ["/img/ok/flaky.png?d=200ms&ng=1", "/img/ok/steady.png"];
    let server = start_server(&page_with_images(&references)).await;
    let dir = TempDir::new().unwrap();

    let mut config = test_config(page_url(&server), dir.path());
    config.attempt.timeout_ms = 300;

    let summary = Pipeline::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.downloaded, 2);
    assert_eq!(requests_for(&server, "/img/ok/flaky.png").await.len(), 2);
    assert_eq!(requests_for(&server, "/img/ok/steady.png").await.len(), 1);
}

#[tokio::test]
async fn test_page_without_images_is_trivial_success() {
    let server = start_server("<html><body><p>Nothing to see</p></body></html>").await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("imgs");

    let pipeline = Pipeline::new(test_config(page_url(&server), &dest)).unwrap();
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.downloaded, 0);
    assert_eq!(summary.peak_in_flight, 0);
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_page_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html/index.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let result = Pipeline::new(test_config(page_url(&server), dir.path()))
        .unwrap()
        .run()
        .await;

    assert!(matches!(result, Err(RippleError::PageStatus { status: 404, .. })));
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_downloads() {
    let references = ["/img/ok/a.png?d=5s", "/img/ok/b.png?d=5s", "/img/ok/c.png?d=5s"];
    let server = start_server(&page_with_images(&references)).await;
    let dir = TempDir::new().unwrap();

    let mut config = test_config(page_url(&server), dir.path());
    config.attempt.timeout_ms = 10_000;
    let pipeline = Pipeline::new(config).unwrap();

    let shutdown = pipeline.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.cancel();
    });

    let started = Instant::now();
    let report = pipeline.run_report().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(report.cancelled_count(), 3);
    assert!(matches!(report.into_result(), Err(RippleError::Cancelled)));
}

#[tokio::test]
async fn test_panicking_task_cancels_siblings_under_fail_fast() {
    let references = [
        "/img/ok/slow1.png?d=2s",
        "/img/ok/doomed.png?panic=1",
        "/img/ok/slow2.png?d=2s",
    ];
    let server = start_server(&page_with_images(&references)).await;
    let dir = TempDir::new().unwrap();

    let mut config = test_config(page_url(&server), dir.path());
    config.pool.max_concurrency = 3;
    config.attempt.timeout_ms = 5000;

    let started = Instant::now();
    let report = Pipeline::new(config).unwrap().run_report().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(matches!(report.tasks[1].outcome, TaskOutcome::Panic(_)));
    assert!(report.tasks[0].outcome.is_cancelled(), "{:?}", report.tasks[0].outcome);
    assert!(report.tasks[2].outcome.is_cancelled(), "{:?}", report.tasks[2].outcome);
    assert!(!dir.path().join("slow1.png").exists());
    assert!(matches!(
        report.into_result(),
        Err(RippleError::TaskPanicked { ref reference, .. }) if reference == "/img/ok/doomed.png?panic=1"
    ));
}
