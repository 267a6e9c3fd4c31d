use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Ripple-Fetch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub pool: PoolSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub attempt: AttemptSection,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// Where images come from and where they land
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Page whose `<img>` references are harvested; also the base for
    /// resolving relative references
    #[serde(rename = "page-url")]
    pub page_url: String,

    /// Directory receiving one file per downloaded image
    #[serde(rename = "destination-dir")]
    pub destination_dir: PathBuf,
}

/// How a pool reacts to the first fatal task failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Cancel every sibling task as soon as one task fails fatally
    #[default]
    FailFast,
    /// Let every task run to completion, then report the first error
    CollectAll,
}

/// Task pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSection {
    /// Maximum number of downloads in flight at once
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: u32,

    #[serde(rename = "failure-policy", default)]
    pub failure_policy: FailurePolicy,

    /// Progress log interval in milliseconds (0 disables progress logging)
    #[serde(
        rename = "progress-interval-ms",
        default = "default_progress_interval_ms"
    )]
    pub progress_interval_ms: u64,
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            failure_policy: FailurePolicy::default(),
            progress_interval_ms: default_progress_interval_ms(),
        }
    }
}

/// Retry backoff configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Retries after the first attempt; total attempts are `max_retries + 1`
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff interval (milliseconds)
    #[serde(rename = "min-interval-ms", default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Backoff interval cap (milliseconds)
    #[serde(rename = "max-interval-ms", default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// Relative jitter applied to each interval, in [0, 1]
    #[serde(rename = "jitter-factor", default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            min_interval_ms: default_min_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

/// Per-attempt limits
#[derive(Debug, Clone, Deserialize)]
pub struct AttemptSection {
    /// Deadline for a single fetch-and-write attempt (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl AttemptSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AttemptSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    #[serde(default = "default_agent_version")]
    pub version: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            version: default_agent_version(),
        }
    }
}

fn default_max_concurrency() -> u32 {
    2
}

fn default_progress_interval_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_min_interval_ms() -> u64 {
    1000
}

fn default_max_interval_ms() -> u64 {
    60_000
}

fn default_jitter_factor() -> f64 {
    0.05
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_agent_name() -> String {
    "ripple-fetch".to_string()
}

fn default_agent_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
