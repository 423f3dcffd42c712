//! List mode: one search per card-list line.

use crate::error::{Error, Result};
use crate::resolver::TargetDir;
use crate::scryfall::search::parse_list_line;
use crate::types::{Event, NotSavedReason, RunSummary};
use std::collections::HashSet;
use std::path::Path;

use super::CardDownloader;

impl CardDownloader {
    /// Resolve each line of `list_path` and download the first match
    ///
    /// Blank lines are ignored. Lines that match nothing, including those whose
    /// search failed outright, count as not saved and the run moves on.
    pub(super) async fn run_list(&self, list_path: &Path, summary: &mut RunSummary) -> Result<()> {
        let content = tokio::fs::read_to_string(list_path)
            .await
            .map_err(|e| Error::at_path(list_path, e))?;

        let mut pool = self.worker_pool();
        let mut prepared = HashSet::new();
        let interval = self.config.api.search_interval;
        let mut searched = false;

        for line in content.lines() {
            let Some(query) = parse_list_line(line) else {
                continue;
            };
            if searched && !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
            searched = true;

            let record = match self.client.search_one(&query).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    self.record_no_match(line, None, summary);
                    continue;
                }
                Err(e) => {
                    self.record_no_match(line, Some(&e), summary);
                    continue;
                }
            };

            self.dispatch(&record, TargetDir::Shared, &mut pool, &mut prepared, summary)
                .await?;
        }

        pool.drain(summary).await;
        Ok(())
    }

    fn record_no_match(&self, line: &str, error: Option<&Error>, summary: &mut RunSummary) {
        let line = line.trim();
        match error {
            Some(e) => tracing::warn!(line, error = %e, "Search request failed"),
            None => tracing::warn!(line, reason = %NotSavedReason::NoMatch, "List line not saved"),
        }
        summary.record_not_saved();
        let _ = self.event_tx.send(Event::NoMatch {
            line: line.to_string(),
        });
    }
}
