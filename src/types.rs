//! Core types and events

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// One card entry from the bulk feed or a search result
///
/// Only the fields the pipeline reads are modelled; everything else in the
/// Scryfall card object is ignored during deserialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    /// Card name (for multi-faced cards, "Front // Back")
    pub name: String,
    /// Set code, e.g. "ltr"
    pub set: String,
    /// Set display name, e.g. "The Lord of the Rings: Tales of Middle-earth"
    pub set_name: String,
    /// Collector number within the set (not always numeric, e.g. "12a")
    pub collector_number: String,
    /// Language code, e.g. "en"
    pub lang: String,
    /// Layout tag, e.g. "normal", "transform", "reversible_card"
    #[serde(default)]
    pub layout: Option<String>,
    /// Type line; absent on reversible cards
    #[serde(default)]
    pub type_line: Option<String>,
    /// Direct image reference for single-image cards
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    /// Per-face data for multi-faced cards
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
}

/// Image URLs offered for a card or a face
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUris {
    /// The "large" rendition (672 x 936 JPEG)
    #[serde(default)]
    pub large: Option<String>,
}

/// One printed side of a multi-faced card
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFace {
    /// Face name
    pub name: String,
    /// Face image, present when each face has its own art
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

impl CardFace {
    /// The face's large image URL, if any
    pub fn large_image(&self) -> Option<&str> {
        self.image_uris.as_ref()?.large.as_deref()
    }
}

impl CardRecord {
    /// The card's direct large image URL, if any
    pub fn large_image(&self) -> Option<&str> {
        self.image_uris.as_ref()?.large.as_deref()
    }
}

/// A single image download: where it comes from and where it lands
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTask {
    /// Remote image URL
    pub url: String,
    /// Final path of the image file
    pub destination: PathBuf,
    /// Card the task belongs to, for reporting
    pub label: String,
}

/// Result of materializing one [`DownloadTask`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The image was fetched and written
    Downloaded {
        /// Bytes written to disk
        bytes: u64,
    },
    /// A file already existed at the destination; nothing was fetched
    Skipped,
    /// Fetching or writing failed; no file was created
    Failed {
        /// Human-readable failure description
        reason: String,
    },
}

/// Why a record, task or list line did not produce a file
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotSavedReason {
    /// The record carries neither a direct image nor two resolvable faces
    NoImage,
    /// The remote fetch (or the write) failed
    FetchFailed(String),
    /// The search returned no card for a list line
    NoMatch,
}

impl fmt::Display for NotSavedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotSavedReason::NoImage => write!(f, "no resolvable image"),
            NotSavedReason::FetchFailed(reason) => write!(f, "fetch failed: {reason}"),
            NotSavedReason::NoMatch => write!(f, "no matching card"),
        }
    }
}

/// Aggregate counters for one invocation
///
/// `skipped` is tracked separately from `saved`: an image already on disk is
/// neither a new save nor a failure.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Images downloaded during this run
    pub saved: u64,
    /// Images already present on disk
    pub skipped: u64,
    /// Records, images or list lines that produced no file
    pub not_saved: u64,
    /// Wall-clock start of the run
    pub started_at: DateTime<Local>,
    /// Wall-clock end of the run (set by [`RunSummary::finish`])
    pub finished_at: Option<DateTime<Local>>,
    /// Elapsed time between start and finish
    pub elapsed: Duration,
    /// Set when the bulk feed ended prematurely
    pub feed_error: Option<String>,
}

impl RunSummary {
    /// Begin a new summary stamped with the current time
    pub fn start() -> Self {
        Self {
            saved: 0,
            skipped: 0,
            not_saved: 0,
            started_at: Local::now(),
            finished_at: None,
            elapsed: Duration::ZERO,
            feed_error: None,
        }
    }

    /// Fold a task outcome into the counters
    pub fn record_task(&mut self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Downloaded { .. } => self.saved += 1,
            TaskOutcome::Skipped => self.skipped += 1,
            TaskOutcome::Failed { .. } => self.not_saved += 1,
        }
    }

    /// Count one unit of input that produced no file
    pub fn record_not_saved(&mut self) {
        self.not_saved += 1;
    }

    /// Stamp the end time and compute the elapsed duration
    pub fn finish(&mut self) {
        let now = Local::now();
        self.elapsed = (now - self.started_at).to_std().unwrap_or_default();
        self.finished_at = Some(now);
    }

    /// Number of images this run tried to account for
    pub fn attempted(&self) -> u64 {
        self.saved + self.skipped + self.not_saved
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Saved: {} ({} already present)",
            self.saved, self.skipped
        )?;
        write!(
            f,
            "Not saved: {}. Elapsed time: {}",
            self.not_saved,
            format_elapsed(self.elapsed)
        )
    }
}

/// Format a duration as `H:MM:SS.mmm`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!(
        "{}:{:02}:{:02}.{:03}",
        total / 3600,
        (total / 60) % 60,
        total % 60,
        elapsed.subsec_millis()
    )
}

/// Event emitted while a run progresses
#[derive(Clone, Debug)]
pub enum Event {
    /// The run started
    Started {
        /// Human-readable description of the input ("set ltr", "list cards.txt")
        source: String,
    },
    /// An image was downloaded
    Saved {
        /// Destination path
        path: PathBuf,
        /// Bytes written
        bytes: u64,
    },
    /// An image was already present
    Skipped {
        /// Destination path
        path: PathBuf,
    },
    /// An image could not be fetched or written
    Failed {
        /// Destination path that was not created
        path: PathBuf,
        /// Failure description
        reason: String,
    },
    /// A record had no resolvable image
    Unresolved {
        /// Card name
        name: String,
        /// Collector number
        collector_number: String,
    },
    /// A list line matched no card
    NoMatch {
        /// The list line as written
        line: String,
    },
    /// The run finished
    Finished {
        /// Final counters
        summary: RunSummary,
    },
}
