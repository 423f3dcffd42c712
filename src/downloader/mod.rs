//! Run orchestration split into focused submodules.
//!
//! The `CardDownloader` struct and its methods are organized by input mode:
//! - [`set_mode`] - stream one set out of the bulk feed
//! - [`list_mode`] - resolve a card list line by line through search
//! - [`pool`] - bounded worker pool that materializes download tasks

mod list_mode;
mod pool;
mod set_mode;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::config::Config;
use crate::error::Result;
use crate::materializer::Materializer;
use crate::resolver::{TargetDir, resolve};
use crate::scryfall::{ScryfallClient, build_http_client};
use crate::types::{CardRecord, Event, NotSavedReason, RunSummary, TaskOutcome};
use crate::utils::ensure_dir;
use pool::WorkerPool;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// What a run consumes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Every record of one set, read from the all-cards bulk feed
    StreamSet {
        /// Set code, e.g. "ltr" (case-insensitive)
        set_code: String,
    },
    /// One search per line of a card-list file
    ListLookup {
        /// Path of the card list
        list_path: PathBuf,
    },
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::StreamSet { set_code } => write!(f, "set {set_code}"),
            Mode::ListLookup { list_path } => write!(f, "list {}", list_path.display()),
        }
    }
}

/// Main downloader instance (cloneable - shares the HTTP client and config)
#[derive(Clone)]
pub struct CardDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Scryfall API client
    pub(crate) client: ScryfallClient,
    /// Image fetcher handed to pool workers
    pub(crate) materializer: Materializer,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl CardDownloader {
    /// Create a downloader from a validated configuration
    ///
    /// One HTTP client is built and shared by API calls and image fetches.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let http = build_http_client(&config.api)?;
        let client = ScryfallClient::new(http.clone(), &config)?;
        let materializer = Materializer::new(http, config.api.timeout, config.retry.clone());
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        Ok(Self {
            config: Arc::new(config),
            client,
            materializer,
            event_tx,
        })
    }

    /// Subscribe to run events
    ///
    /// Events are dropped for subscribers that fall more than 1000 behind.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Execute one run and return its counters
    ///
    /// Per-record, per-task and per-line failures are counted and logged. The
    /// run itself fails only when it cannot start: an unknown set, an
    /// unreachable set or bulk-data endpoint, an unreadable card list.
    pub async fn run(&self, mode: Mode) -> Result<RunSummary> {
        let mut summary = RunSummary::start();
        let source = mode.to_string();
        tracing::info!(
            source = %source,
            output = %self.config.output_dir.display(),
            concurrency = self.config.download.max_concurrent_downloads,
            "Run started"
        );
        let _ = self.event_tx.send(Event::Started { source });

        match &mode {
            Mode::StreamSet { set_code } => self.run_set(set_code, &mut summary).await?,
            Mode::ListLookup { list_path } => self.run_list(list_path, &mut summary).await?,
        }

        summary.finish();
        tracing::info!(
            saved = summary.saved,
            skipped = summary.skipped,
            not_saved = summary.not_saved,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            feed_error = summary.feed_error.as_deref(),
            "Run finished"
        );
        let _ = self.event_tx.send(Event::Finished {
            summary: summary.clone(),
        });
        Ok(summary)
    }

    fn worker_pool(&self) -> WorkerPool {
        WorkerPool::new(
            self.materializer.clone(),
            self.config.download.max_concurrent_downloads,
            self.event_tx.clone(),
        )
    }

    /// Resolve one record and queue its downloads
    ///
    /// `prepared` remembers directories already created during this run.
    async fn dispatch(
        &self,
        record: &CardRecord,
        target: TargetDir,
        pool: &mut WorkerPool,
        prepared: &mut HashSet<PathBuf>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let dir = target.directory_for(&self.config.output_dir, record);
        let tasks = resolve(record, &dir);
        if tasks.is_empty() {
            tracing::warn!(
                name = %record.name,
                set = %record.set,
                collector_number = %record.collector_number,
                reason = %NotSavedReason::NoImage,
                "Record not saved"
            );
            summary.record_not_saved();
            let _ = self.event_tx.send(Event::Unresolved {
                name: record.name.clone(),
                collector_number: record.collector_number.clone(),
            });
            return Ok(());
        }

        if !prepared.contains(&dir) {
            if let Err(e) = ensure_dir(&dir).await {
                tracing::warn!(dir = %dir.display(), error = %e, "Cannot create image directory");
                let reason = NotSavedReason::FetchFailed(e.to_string()).to_string();
                for task in tasks {
                    pool.record(
                        &task,
                        &TaskOutcome::Failed {
                            reason: reason.clone(),
                        },
                        summary,
                    );
                }
                return Ok(());
            }
            prepared.insert(dir);
        }

        for task in tasks {
            pool.submit(task, summary).await?;
        }
        Ok(())
    }
}
