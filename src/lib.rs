//! # scryfall-dl
//!
//! Downloads Magic: The Gathering card images referenced by the Scryfall API
//! into a local folder tree, one `.jpg` per printed face.
//!
//! ## Design Philosophy
//!
//! scryfall-dl is designed to be:
//! - **Idempotent** - the output folder is the only record of what was fetched;
//!   rerunning a set downloads only what is missing
//! - **Streaming** - the multi-gigabyte bulk feed is filtered as it arrives and
//!   never held in memory
//! - **Library-first** - the `scryfall-dl` binary is a thin shell over
//!   [`CardDownloader`]
//! - **Event-driven** - consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use scryfall_dl::{CardDownloader, Config, Mode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         output_dir: "art".into(),
//!         ..Default::default()
//!     };
//!
//!     let downloader = CardDownloader::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = downloader
//!         .run(Mode::StreamSet { set_code: "ltr".into() })
//!         .await?;
//!     println!("{summary}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Run orchestration (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Binder gallery rendering
pub mod gallery;
/// Image download and atomic persistence
pub mod materializer;
/// Record-to-file resolution
pub mod resolver;
/// Retry logic with exponential backoff
pub mod retry;
/// Scryfall API client
pub mod scryfall;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{ApiConfig, Config, DownloadConfig, RetryConfig};
pub use downloader::{CardDownloader, Mode};
pub use error::{Error, Result};
pub use gallery::{BinderOptions, render_binder};
pub use materializer::Materializer;
pub use resolver::{ImageShape, TargetDir, classify, resolve};
pub use scryfall::ScryfallClient;
pub use scryfall::bulk::{CardStream, RecordFilter};
pub use scryfall::search::{CardQuery, parse_list_line};
pub use types::{CardRecord, DownloadTask, Event, RunSummary, TaskOutcome};
pub use utils::sanitize_filename;

/// Run `mode` until it finishes or a termination signal arrives.
///
/// Returns `Ok(None)` when interrupted. Downloads in flight are abandoned; a
/// `.part` file left behind is overwritten by the next run.
///
/// On Unix both SIGTERM and SIGINT stop the run; elsewhere only Ctrl+C does.
///
/// # Example
///
/// ```no_run
/// use scryfall_dl::{CardDownloader, Config, Mode, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = CardDownloader::new(Config::default())?;
///     let mode = Mode::StreamSet { set_code: "ltr".into() };
///
///     if let Some(summary) = run_with_shutdown(&downloader, mode).await? {
///         println!("{summary}");
///     }
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(
    downloader: &CardDownloader,
    mode: Mode,
) -> Result<Option<RunSummary>> {
    tokio::select! {
        result = downloader.run(mode) => result.map(Some),
        _ = wait_for_signal() => {
            tracing::warn!("Run interrupted, abandoning downloads in flight");
            Ok(None)
        }
    }
}

/// Completes once a stop signal arrives
///
/// A signal whose handler cannot be installed is ignored; with neither
/// available only Ctrl+C is honoured.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    fn install(kind: SignalKind, name: &'static str) -> Option<Signal> {
        match signal(kind) {
            Ok(stream) => Some(stream),
            Err(e) => {
                tracing::warn!(error = %e, signal = name, "Signal handler unavailable");
                None
            }
        }
    }

    async fn received(stream: Option<&mut Signal>) {
        match stream {
            Some(stream) => {
                stream.recv().await;
            }
            None => std::future::pending().await,
        }
    }

    let mut terminate = install(SignalKind::terminate(), "SIGTERM");
    let mut interrupt = install(SignalKind::interrupt(), "SIGINT");
    if terminate.is_none() && interrupt.is_none() {
        ctrl_c().await;
        return;
    }

    let name = tokio::select! {
        _ = received(terminate.as_mut()) => "SIGTERM",
        _ = received(interrupt.as_mut()) => "SIGINT",
    };
    tracing::info!(signal = name, "Stop requested");
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

/// Ctrl+C, or never if it cannot be listened for
async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(signal = "Ctrl+C", "Stop requested"),
        Err(e) => {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C, run is not interruptible");
            std::future::pending::<()>().await;
        }
    }
}
