//! Set mode: stream one set out of the all-cards bulk feed.

use crate::error::Result;
use crate::resolver::TargetDir;
use crate::scryfall::bulk::RecordFilter;
use crate::types::RunSummary;
use std::collections::HashSet;

use super::CardDownloader;

impl CardDownloader {
    /// Download every image of `set_code` in the configured language
    ///
    /// A feed that breaks off mid-stream is not fatal: records already seen are
    /// still materialized and the error is kept in [`RunSummary::feed_error`].
    pub(super) async fn run_set(&self, set_code: &str, summary: &mut RunSummary) -> Result<()> {
        let filter = RecordFilter::new(set_code, &self.config.language);
        let mut stream = self.client.open_set_feed(filter).await?;

        let mut pool = self.worker_pool();
        let mut prepared = HashSet::new();
        let mut records = 0u64;

        while let Some(item) = stream.next().await {
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!(set = set_code, records, error = %e, "Bulk feed broke off");
                    summary.feed_error = Some(e.to_string());
                    break;
                }
            };
            records += 1;
            self.dispatch(&record, TargetDir::PerSet, &mut pool, &mut prepared, summary)
                .await?;
        }

        pool.drain(summary).await;
        tracing::info!(set = set_code, records, "Set records processed");
        Ok(())
    }
}
