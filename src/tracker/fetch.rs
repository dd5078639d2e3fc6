use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{AlmError, Result};
use crate::persist::write_atomically;

use super::client::SuiteSource;
use super::retry::RetryPolicy;

/// Aggregate outcome of a batch fetch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchStats {
    /// Distinct suites considered
    pub total: usize,
    pub fetched: usize,
    /// Suites whose payload file already existed
    pub skipped: usize,
    pub failures: Vec<SuiteFailure>,
}

impl FetchStats {
    pub fn errors(&self) -> usize {
        self.failures.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteFailure {
    pub suite_id: u64,
    pub message: String,
}

enum SuiteOutcome {
    Fetched,
    Skipped,
    Failed(String),
}

/// Enforces a minimum gap between requests, shared by all in-flight suites.
struct Pacer {
    spacing: std::time::Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    fn new(spacing: std::time::Duration) -> Self {
        Self {
            spacing,
            last: Mutex::new(None),
        }
    }

    async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.spacing).await;
        }
        *last = Some(Instant::now());
    }

    /// The gap is also measured from the end of the latest request.
    async fn finish(&self) {
        let mut last = self.last.lock().await;
        let now = Instant::now();
        if last.map_or(true, |previous| previous < now) {
            *last = Some(now);
        }
    }
}

/// Downloads the raw test-case payload of every suite into `{suite_id}.json`.
///
/// Suites are independent: a failing suite is recorded and the batch moves
/// on. A suite whose file already exists is never requested again, and a file
/// only appears once its payload has been fully received.
pub struct FetchOrchestrator<'a, S> {
    source: &'a S,
    policy: &'a RetryPolicy,
    output_dir: PathBuf,
    pacer: Pacer,
}

impl<'a, S: SuiteSource> FetchOrchestrator<'a, S> {
    pub fn new(source: &'a S, policy: &'a RetryPolicy, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            policy,
            output_dir: output_dir.into(),
            pacer: Pacer::new(policy.request_spacing),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn output_path(&self, suite_id: u64) -> PathBuf {
        self.output_dir.join(format!("{suite_id}.json"))
    }

    /// Fetches the given suites in ascending id order, at most
    /// `policy.max_concurrent` at a time.
    pub async fn fetch_all(&self, suite_ids: &[u64]) -> FetchStats {
        let mut ids = suite_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let total = ids.len();
        let mut stats = FetchStats {
            total,
            ..FetchStats::default()
        };

        info!(
            "Fetching test cases for {total} suites into {}",
            self.output_dir.display()
        );

        let mut outcomes = stream::iter(ids.into_iter().enumerate())
            .map(|(index, suite_id)| async move {
                let outcome = self.process_suite(index + 1, total, suite_id).await;
                (suite_id, outcome)
            })
            .buffer_unordered(self.policy.max_concurrent);

        while let Some((suite_id, outcome)) = outcomes.next().await {
            match outcome {
                SuiteOutcome::Fetched => stats.fetched += 1,
                SuiteOutcome::Skipped => stats.skipped += 1,
                SuiteOutcome::Failed(message) => {
                    stats.failures.push(SuiteFailure { suite_id, message });
                }
            }
        }

        stats.failures.sort_by_key(|failure| failure.suite_id);

        info!(
            "Fetch finished: {} fetched, {} skipped, {} errors",
            stats.fetched,
            stats.skipped,
            stats.errors()
        );

        stats
    }

    async fn process_suite(&self, position: usize, total: usize, suite_id: u64) -> SuiteOutcome {
        let path = self.output_path(suite_id);
        if path.exists() {
            info!(
                "[{position}/{total}] Suite {suite_id}: skipped ({} already exists)",
                path.display()
            );
            return SuiteOutcome::Skipped;
        }

        let result = self
            .fetch_with_retry(suite_id)
            .await
            .and_then(|body| write_atomically(&path, body.as_bytes()));

        match result {
            Ok(()) => {
                info!("[{position}/{total}] Suite {suite_id}: OK");
                SuiteOutcome::Fetched
            }
            Err(e) => {
                warn!("[{position}/{total}] Suite {suite_id}: {e}");
                SuiteOutcome::Failed(e.to_string())
            }
        }
    }

    async fn fetch_with_retry(&self, suite_id: u64) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            self.pacer.wait().await;
            let result = self.source.fetch_suite(suite_id).await;
            self.pacer.finish().await;

            match result {
                Ok(body) => {
                    debug!("Suite {suite_id}: received {} bytes", body.len());
                    return Ok(body);
                }
                Err(e) if self.policy.is_retryable(&e) => {
                    if attempt >= self.policy.max_attempts {
                        return Err(AlmError::RetriesExhausted {
                            attempts: attempt,
                            source: Box::new(e),
                        });
                    }

                    let delay = self.policy.backoff(attempt);
                    warn!(
                        "Suite {suite_id}: {e}. Retrying in {delay:?} ({attempt}/{})...",
                        self.policy.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
