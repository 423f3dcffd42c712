//! Artifact materialization: fetch an image once and persist it atomically
//!
//! A file already present at the destination is trusted as complete. New
//! images are streamed into a `.part` file beside the destination and renamed
//! into place only after the whole body has been written, so an interrupted
//! run never leaves a truncated file under the final name.

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::types::{DownloadTask, TaskOutcome};
use crate::utils::{http_status_error, partial_path};
use futures::StreamExt;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Downloads [`DownloadTask`]s to disk (cloneable - shares the HTTP client)
#[derive(Clone)]
pub struct Materializer {
    client: reqwest::Client,
    timeout: Duration,
    retry: RetryConfig,
}

impl Materializer {
    /// Create a materializer around an existing HTTP client
    ///
    /// `timeout` bounds each image request from connect to last byte.
    pub fn new(client: reqwest::Client, timeout: Duration, retry: RetryConfig) -> Self {
        Self {
            client,
            timeout,
            retry,
        }
    }

    /// Ensure the task's image exists at its destination
    ///
    /// The destination directory must already exist.
    pub async fn materialize(&self, task: &DownloadTask) -> TaskOutcome {
        if is_regular_file(task).await {
            tracing::debug!(path = %task.destination.display(), "Image already present, skipping");
            return TaskOutcome::Skipped;
        }

        match with_retry(&self.retry, || self.fetch_to_disk(task)).await {
            Ok(bytes) => {
                tracing::debug!(
                    path = %task.destination.display(),
                    bytes,
                    "Image saved"
                );
                TaskOutcome::Downloaded { bytes }
            }
            Err(e) => {
                let partial = partial_path(&task.destination);
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!(
                        path = %partial.display(),
                        error = %cleanup,
                        "Failed to remove partial download"
                    );
                }
                tracing::warn!(
                    url = %task.url,
                    path = %task.destination.display(),
                    error = %e,
                    "Image download failed"
                );
                TaskOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn fetch_to_disk(&self, task: &DownloadTask) -> Result<u64> {
        let response = self
            .client
            .get(&task.url)
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(http_status_error(response).await);
        }

        let partial = partial_path(&task.destination);
        let mut file = tokio::fs::File::create(&partial)
            .await
            .map_err(|e| Error::at_path(&partial, e))?;

        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::at_path(&partial, e))?;
            written += chunk.len() as u64;
        }
        file.sync_all()
            .await
            .map_err(|e| Error::at_path(&partial, e))?;
        drop(file);

        tokio::fs::rename(&partial, &task.destination)
            .await
            .map_err(|e| Error::at_path(&task.destination, e))?;
        Ok(written)
    }
}

async fn is_regular_file(task: &DownloadTask) -> bool {
    tokio::fs::metadata(&task.destination)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const JPEG: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg-body\xff\xd9";

    fn materializer() -> Materializer {
        let retry = RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
            jitter: false,
        };
        Materializer::new(reqwest::Client::new(), Duration::from_secs(5), retry)
    }

    fn task(server: &MockServer, remote: &str, dir: &Path) -> DownloadTask {
        DownloadTask {
            url: format!("{}{}", server.uri(), remote),
            destination: dir.join("1_Frodo.jpg"),
            label: "Frodo (ltr #1)".into(),
        }
    }

    #[tokio::test]
    async fn downloads_and_renames_into_place() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
            .expect(1)
            .mount(&server)
            .await;
        let temp = tempfile::tempdir().unwrap();
        let task = task(&server, "/a.jpg", temp.path());

        let outcome = materializer().materialize(&task).await;

        assert_eq!(
            outcome,
            TaskOutcome::Downloaded {
                bytes: JPEG.len() as u64
            }
        );
        assert_eq!(std::fs::read(&task.destination).unwrap(), JPEG);
        assert!(!partial_path(&task.destination).exists());
    }

    #[tokio::test]
    async fn existing_file_is_skipped_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
            .expect(0)
            .mount(&server)
            .await;
        let temp = tempfile::tempdir().unwrap();
        let task = task(&server, "/a.jpg", temp.path());
        // existence alone marks completion, even for an empty file
        std::fs::write(&task.destination, b"").unwrap();

        let outcome = materializer().materialize(&task).await;

        assert_eq!(outcome, TaskOutcome::Skipped);
        assert_eq!(std::fs::read(&task.destination).unwrap(), b"");
    }

    #[tokio::test]
    async fn directory_at_destination_is_not_treated_as_done() {
        let server = MockServer::start().await;
        let temp = tempfile::tempdir().unwrap();
        let task = task(&server, "/a.jpg", temp.path());
        std::fs::create_dir(&task.destination).unwrap();
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
            .mount(&server)
            .await;

        let outcome = materializer().materialize(&task).await;

        assert!(matches!(outcome, TaskOutcome::Failed { .. }), "got {outcome:?}");
    }

    #[tokio::test]
    async fn not_found_fails_without_creating_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such image"))
            .expect(1)
            .mount(&server)
            .await;
        let temp = tempfile::tempdir().unwrap();
        let task = task(&server, "/missing.jpg", temp.path());

        let outcome = materializer().materialize(&task).await;

        match outcome {
            TaskOutcome::Failed { reason } => {
                assert!(reason.contains("404"), "got {reason}");
                assert!(reason.contains("no such image"), "got {reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!task.destination.exists());
        assert!(!partial_path(&task.destination).exists());
    }

    #[tokio::test]
    async fn transient_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky.jpg"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
            .mount(&server)
            .await;
        let temp = tempfile::tempdir().unwrap();
        let task = task(&server, "/flaky.jpg", temp.path());

        let outcome = materializer().materialize(&task).await;

        assert!(matches!(outcome, TaskOutcome::Downloaded { .. }), "got {outcome:?}");
        assert!(task.destination.is_file());
    }

    #[tokio::test]
    async fn persistent_server_error_gives_up_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;
        let temp = tempfile::tempdir().unwrap();
        let task = task(&server, "/a.jpg", temp.path());

        let outcome = materializer().materialize(&task).await;

        assert!(matches!(outcome, TaskOutcome::Failed { .. }));
        assert!(!task.destination.exists());
    }

    #[tokio::test]
    async fn missing_directory_fails_cleanly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
            .mount(&server)
            .await;
        let temp = tempfile::tempdir().unwrap();
        let task = task(&server, "/a.jpg", &temp.path().join("never_created"));

        let outcome = materializer().materialize(&task).await;

        assert!(matches!(outcome, TaskOutcome::Failed { .. }));
    }
}
