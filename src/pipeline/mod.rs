//! End-to-end pipeline: page fetch, reference extraction, pooled downloads
//!
//! The pipeline owns the shutdown signal for a run. The pool it drives gets
//! a child of that signal, so an interrupt cancels the downloads while a
//! fail-fast cancellation stays inside the pool.

use crate::config::Config;
use crate::download::{BackoffPolicy, DownloadTask, Downloader};
use crate::page::{build_http_client, fetch_references};
use crate::pool::{PoolConfig, PoolReport, TaskPool};
use crate::RippleError;
use reqwest::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub page_url: Url,

    /// Number of images written to the destination directory
    pub downloaded: usize,

    /// Highest number of downloads observed in flight at once
    pub peak_in_flight: usize,
}

/// Drives one harvest of a page's images
pub struct Pipeline {
    config: Config,
    client: Client,
    page_url: Url,
    shutdown: CancellationToken,
}

impl Pipeline {
    /// Creates a new pipeline
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Pipeline)` - Ready to run
    /// * `Err(RippleError)` - The page URL does not parse or the HTTP client
    ///   could not be built
    pub fn new(config: Config) -> Result<Self, RippleError> {
        let page_url = Url::parse(&config.source.page_url)?;
        let client = build_http_client(&config.user_agent)?;

        Ok(Self {
            config,
            client,
            page_url,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    /// Returns the run's shutdown signal; cancelling it stops the run
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Fetches the page and returns its image references in document order
    pub async fn references(&self) -> Result<Vec<String>, RippleError> {
        fetch_references(&self.client, &self.page_url).await
    }

    /// Runs the pipeline and returns the per-task report
    ///
    /// A page with no image references completes immediately with an empty
    /// report; the pool is never started and the destination directory is
    /// left untouched.
    pub async fn run_report(&self) -> Result<PoolReport, RippleError> {
        let references = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(RippleError::Cancelled),
            references = self.references() => references?,
        };

        if references.is_empty() {
            tracing::info!(page = %self.page_url, "No images referenced");
            return Ok(PoolReport::default());
        }

        let destination = &self.config.source.destination_dir;
        tokio::fs::create_dir_all(destination).await?;

        let downloader = Arc::new(Downloader::new(
            self.client.clone(),
            self.page_url.clone(),
            BackoffPolicy::from(&self.config.retry),
            self.config.attempt.timeout(),
        ));

        let tasks: Vec<DownloadTask> = references
            .into_iter()
            .map(|reference| DownloadTask::new(reference, destination.clone()))
            .collect();

        tracing::info!(
            images = tasks.len(),
            destination = %destination.display(),
            max_concurrency = self.config.pool.max_concurrency,
            "Starting downloads"
        );

        let pool = TaskPool::with_cancellation(
            PoolConfig::from(&self.config.pool),
            self.shutdown.child_token(),
        );

        let report = pool
            .run(tasks, |task, cancel| {
                let downloader = Arc::clone(&downloader);
                async move { downloader.download(&task, &cancel).await.map(|_| ()) }
            })
            .await;

        Ok(report)
    }

    /// Runs the pipeline and collapses the report into a single result
    ///
    /// # Returns
    ///
    /// * `Ok(PipelineSummary)` - Every referenced image was downloaded
    /// * `Err(RippleError)` - The page could not be harvested, or the error
    ///   of the earliest-submitted task that failed or panicked
    pub async fn run(&self) -> Result<PipelineSummary, RippleError> {
        let stats = self.run_report().await?.into_result()?;

        Ok(PipelineSummary {
            page_url: self.page_url.clone(),
            downloaded: stats.succeeded,
            peak_in_flight: stats.peak_in_flight,
        })
    }
}
