//! Simulated image server shared by the integration tests
//!
//! Mirrors the behavior the pipeline is tuned against:
//! - `/img/ok/...` answers 200 with a PNG body after a delay
//! - `/img/ng/...` always answers 500
//! - `d=<duration>` sets the delay (`ms` or `s` suffix)
//! - `ng=<n>` with n > 0 adds a second `d` of delay, or 60s when `d` is absent

use ripple_fetch::config::{
    AttemptSection, Config, FailurePolicy, PoolSection, RetrySection, SourceConfig,
    UserAgentConfig,
};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDRfake";

pub const PAGE_PATH: &str = "/html/index.html";

/// Answers image requests according to the `d` and `ng` query parameters
pub struct ImageResponder;

impl Respond for ImageResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut delay = None;
        let mut countdown = 0u32;
        for (key, value) in request.url.query_pairs() {
            match key.as_ref() {
                "d" => delay = parse_delay(&value),
                "ng" => countdown = value.parse().unwrap_or(0),
                _ => {}
            }
        }

        let base = delay.unwrap_or_default();
        let total = if countdown > 0 {
            base + delay.unwrap_or(Duration::from_secs(60))
        } else {
            base
        };

        ResponseTemplate::new(200)
            .insert_header("content-type", "image/png")
            .set_body_bytes(PNG.to_vec())
            .set_delay(total)
    }
}

fn parse_delay(value: &str) -> Option<Duration> {
    if let Some(ms) = value.strip_suffix("ms") {
        ms.parse().ok().map(Duration::from_millis)
    } else if let Some(s) = value.strip_suffix('s') {
        s.parse().ok().map(Duration::from_secs_f64)
    } else {
        None
    }
}

/// Starts a simulated server serving `html` at [`PAGE_PATH`]
pub async fn start_server(html: &str) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(html),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/img/ng/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/img/ok/"))
        .respond_with(ImageResponder)
        .mount(&server)
        .await;

    server
}

/// Builds an HTML page with one `<img>` per reference
pub fn page_with_images(references: &[&str]) -> String {
    let images: String = references
        .iter()
        .map(|r| format!("    <img src=\"{}\">\n", r))
        .collect();
    format!(
        "<html>\n<head><title>Gallery</title></head>\n<body>\n{}</body>\n</html>\n",
        images
    )
}

pub fn page_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), PAGE_PATH)
}

/// Creates a test configuration with short backoff intervals
pub fn test_config(page_url: String, destination_dir: &Path) -> Config {
    Config {
        source: SourceConfig {
            page_url,
            destination_dir: destination_dir.to_path_buf(),
        },
        pool: PoolSection {
            max_concurrency: 2,
            failure_policy: FailurePolicy::FailFast,
            progress_interval_ms: 0,
        },
        retry: RetrySection {
            max_retries: 3,
            min_interval_ms: 10,
            max_interval_ms: 50,
            jitter_factor: 0.05,
        },
        attempt: AttemptSection { timeout_ms: 2000 },
        user_agent: UserAgentConfig {
            name: "TestBot".to_string(),
            version: "1.0.0".to_string(),
        },
    }
}

/// Requests the server received for paths starting with `prefix`
pub async fn requests_for(server: &MockServer, prefix: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path().starts_with(prefix))
        .collect()
}
