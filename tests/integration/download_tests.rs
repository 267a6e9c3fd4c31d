//! Downloader tests against the simulated server

use crate::common::{page_url, requests_for, start_server, PNG};
use ripple_fetch::config::UserAgentConfig;
use ripple_fetch::page::build_http_client;
use ripple_fetch::{BackoffPolicy, DownloadTask, Downloader, TaskError};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;

fn downloader(server: &wiremock::MockServer, max_retries: u32, timeout: Duration) -> Downloader {
    let policy = BackoffPolicy {
        max_retries,
        min_interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(50),
        jitter_factor: 0.05,
    };
    Downloader::new(
        build_http_client(&UserAgentConfig::default()).unwrap(),
        Url::parse(&page_url(server)).unwrap(),
        policy,
        timeout,
    )
}

#[tokio::test]
async fn test_countdown_recovers_on_final_attempt() {
    let server = start_server("").await;
    let dir = TempDir::new().unwrap();

    // Attempts 1 and 2 take 400ms against a 300ms deadline; attempt 3 takes 200ms
    let task = DownloadTask::new("/img/ok/countdown.png?d=200ms&ng=2", dir.path());
    let report = downloader(&server, 3, Duration::from_millis(300))
        .download(&task, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.attempts, 3);
    assert_eq!(report.path, dir.path().join("countdown.png"));
    assert_eq!(std::fs::read(&report.path).unwrap(), PNG);

    let countdowns: Vec<Option<String>> = requests_for(&server, "/img/ok/countdown.png")
        .await
        .iter()
        .map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "ng")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(
        countdowns,
        vec![Some("2".to_string()), Some("1".to_string()), None]
    );
}

#[tokio::test]
async fn test_countdown_exhausts_retries() {
    let server = start_server("").await;
    let dir = TempDir::new().unwrap();

    let task = DownloadTask::new("/img/ok/stubborn.png?d=200ms&ng=10", dir.path());
    let err = downloader(&server, 2, Duration::from_millis(300))
        .download(&task, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        TaskError::RetriesExhausted {
            reference,
            attempts,
        } => {
            assert_eq!(reference, "/img/ok/stubborn.png?d=200ms&ng=10");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(requests_for(&server, "/img/ok/stubborn.png").await.len(), 3);
    assert!(!dir.path().join("stubborn.png").exists());
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = start_server("").await;
    let dir = TempDir::new().unwrap();

    let task = DownloadTask::new("/img/ng/broken.png", dir.path());
    let err = downloader(&server, 3, Duration::from_secs(2))
        .download(&task, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TaskError::Status { status: 500, .. }));
    assert_eq!(requests_for(&server, "/img/ng/").await.len(), 1);
}

#[tokio::test]
async fn test_relative_reference_resolves_against_page() {
    let server = start_server("").await;
    let dir = TempDir::new().unwrap();

    let task = DownloadTask::new("../../img/ok/relative.png", dir.path());
    let report = downloader(&server, 0, Duration::from_secs(2))
        .download(&task, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.attempts, 1);
    assert_eq!(requests_for(&server, "/img/ok/relative.png").await.len(), 1);
}
