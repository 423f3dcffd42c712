//! Test configuration helpers for pointing a downloader at a mock Scryfall

use scryfall_dl::{CardDownloader, Config, RetryConfig};
use std::path::Path;
use std::time::Duration;
use wiremock::MockServer;

/// Config aimed at `server`, writing images under `output`
///
/// Retries are quick and searches are not throttled so tests stay fast.
pub fn mock_config(server: &MockServer, output: &Path) -> Config {
    let mut config = Config::default();
    config.output_dir = output.to_path_buf();
    config.api.base_url = server.uri();
    config.api.search_interval = Duration::ZERO;
    config.retry = RetryConfig {
        max_attempts: 1,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}

/// Downloader built from [`mock_config`]
pub fn mock_downloader(server: &MockServer, output: &Path) -> CardDownloader {
    CardDownloader::new(mock_config(server, output)).expect("valid test config")
}
