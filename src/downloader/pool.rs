//! Bounded worker pool for image downloads.
//!
//! At most `max_concurrent_downloads` tasks are in flight; [`WorkerPool::submit`]
//! waits for a free slot, which in turn slows down whatever feeds the pool.
//! Two tasks never write the same destination at once: a task whose file is
//! still being fetched by an earlier one waits for it, then finds the file
//! present. Outcomes are folded into the summary only on the orchestrator task.

use crate::error::{Error, Result};
use crate::materializer::Materializer;
use crate::types::{DownloadTask, Event, RunSummary, TaskOutcome};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::{Id, JoinError, JoinSet};

type Joined = std::result::Result<(Id, (DownloadTask, TaskOutcome)), JoinError>;

pub(super) struct WorkerPool {
    materializer: Materializer,
    concurrent_limit: Arc<Semaphore>,
    running: JoinSet<(DownloadTask, TaskOutcome)>,
    /// Destination of every spawned task not yet folded
    in_flight: HashMap<Id, PathBuf>,
    event_tx: broadcast::Sender<Event>,
}

impl WorkerPool {
    pub(super) fn new(
        materializer: Materializer,
        max_concurrent: usize,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            materializer,
            concurrent_limit: Arc::new(Semaphore::new(max_concurrent.max(1))),
            running: JoinSet::new(),
            in_flight: HashMap::new(),
            event_tx,
        }
    }

    /// Start `task` once a slot is free, folding whatever finished meanwhile
    pub(super) async fn submit(
        &mut self,
        task: DownloadTask,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if self.is_in_flight(&task.destination) {
            tracing::debug!(path = %task.destination.display(), "Waiting on same file");
            while self.is_in_flight(&task.destination) {
                match self.running.join_next_with_id().await {
                    Some(joined) => self.fold(joined, summary),
                    None => break,
                }
            }
        }

        let permit = Arc::clone(&self.concurrent_limit)
            .acquire_owned()
            .await
            .map_err(|_| Error::Other("worker pool closed".to_string()))?;

        tracing::debug!(label = %task.label, path = %task.destination.display(), "Queued image");
        let destination = task.destination.clone();
        let materializer = self.materializer.clone();
        let handle = self.running.spawn(async move {
            let outcome = materializer.materialize(&task).await;
            drop(permit);
            (task, outcome)
        });
        self.in_flight.insert(handle.id(), destination);

        while let Some(joined) = self.running.try_join_next_with_id() {
            self.fold(joined, summary);
        }
        Ok(())
    }

    /// Wait for every outstanding task
    pub(super) async fn drain(&mut self, summary: &mut RunSummary) {
        while let Some(joined) = self.running.join_next_with_id().await {
            self.fold(joined, summary);
        }
    }

    fn is_in_flight(&self, destination: &Path) -> bool {
        self.in_flight.values().any(|path| path == destination)
    }

    fn fold(&mut self, joined: Joined, summary: &mut RunSummary) {
        match joined {
            Ok((id, (task, outcome))) => {
                self.in_flight.remove(&id);
                self.record(&task, &outcome, summary);
            }
            Err(e) => {
                let path = self.in_flight.remove(&e.id());
                tracing::error!(error = %e, path = ?path, "Download worker panicked");
                summary.record_not_saved();
            }
        }
    }

    /// Count an outcome and announce it
    pub(super) fn record(
        &self,
        task: &DownloadTask,
        outcome: &TaskOutcome,
        summary: &mut RunSummary,
    ) {
        summary.record_task(outcome);
        let path = task.destination.clone();
        let event = match outcome {
            TaskOutcome::Downloaded { bytes } => Event::Saved {
                path,
                bytes: *bytes,
            },
            TaskOutcome::Skipped => Event::Skipped { path },
            TaskOutcome::Failed { reason } => Event::Failed {
                path,
                reason: reason.clone(),
            },
        };
        let _ = self.event_tx.send(event);
    }
}
