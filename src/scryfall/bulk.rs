//! Streaming reader for the bulk card feed
//!
//! The feed is one JSON array with hundreds of thousands of card objects.
//! It is parsed element by element on a blocking thread: each element is
//! captured as a raw JSON slice, checked for `set` and `lang`, and fully
//! deserialized only when it passes the [`RecordFilter`]. Matching records are
//! handed to the async side through a bounded channel, so memory use does not
//! grow with the feed.

use crate::error::{Error, Result};
use crate::types::CardRecord;
use futures::TryStreamExt;
use serde::Deserialize;
use serde::de::{SeqAccess, Visitor};
use serde_json::value::RawValue;
use std::fmt;
use std::io::Read;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::io::{StreamReader, SyncIoBridge};

/// `type` of the bulk-data entry holding every card in every language
pub const ALL_CARDS: &str = "all_cards";

/// The `/bulk-data` index response
#[derive(Debug, Deserialize)]
pub(crate) struct BulkIndex {
    pub data: Vec<BulkEntry>,
}

/// One feed offered by the bulk-data index
#[derive(Clone, Debug, Deserialize)]
pub struct BulkEntry {
    /// Stable feed identifier, e.g. "all_cards", "default_cards"
    #[serde(rename = "type")]
    pub kind: String,
    /// Where the feed can be downloaded
    pub download_uri: String,
    /// Feed size in bytes, when advertised
    #[serde(default)]
    pub size: Option<u64>,
    /// Last regeneration time, when advertised
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl BulkIndex {
    /// Select the entry with the given `type`
    pub fn find(self, kind: &str) -> Result<BulkEntry> {
        self.data
            .into_iter()
            .find(|entry| entry.kind == kind)
            .ok_or_else(|| Error::BulkFeedMissing(kind.to_string()))
    }
}

/// Per-record predicate applied while the feed streams
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordFilter {
    set_code: String,
    lang: String,
}

impl RecordFilter {
    /// Keep records of `set_code` (case-insensitive) printed in `lang`
    pub fn new(set_code: &str, lang: &str) -> Self {
        Self {
            set_code: set_code.trim().to_ascii_lowercase(),
            lang: lang.trim().to_string(),
        }
    }

    /// The normalized set code
    pub fn set_code(&self) -> &str {
        &self.set_code
    }

    /// The target language
    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Whether a record with these identity fields should be kept
    pub fn matches(&self, set: &str, lang: &str) -> bool {
        set.eq_ignore_ascii_case(&self.set_code) && lang == self.lang
    }
}

/// Counters reported once the feed has been consumed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Elements read from the feed
    pub scanned: u64,
    /// Elements that passed the filter and were delivered
    pub matched: u64,
    /// Elements that could not be interpreted as card records
    pub malformed: u64,
    /// The consumer went away before the feed ended
    pub stopped: bool,
}

/// Destination for records that pass the filter
pub trait RecordSink {
    /// Take one record; returning `false` stops the reader
    fn accept(&mut self, record: CardRecord) -> bool;

    /// Whether the consumer is gone, checked between elements
    fn is_closed(&self) -> bool {
        false
    }
}

impl RecordSink for Vec<CardRecord> {
    fn accept(&mut self, record: CardRecord) -> bool {
        self.push(record);
        true
    }
}

impl RecordSink for mpsc::Sender<Result<CardRecord>> {
    fn accept(&mut self, record: CardRecord) -> bool {
        self.blocking_send(Ok(record)).is_ok()
    }

    fn is_closed(&self) -> bool {
        mpsc::Sender::is_closed(self)
    }
}

#[derive(Deserialize)]
struct SetAndLang {
    #[serde(default)]
    set: Option<String>,
    #[serde(default)]
    lang: Option<String>,
}

struct FeedVisitor<'a, S> {
    filter: &'a RecordFilter,
    sink: &'a mut S,
    stats: &'a mut FeedStats,
}

impl<'de, S: RecordSink> Visitor<'de> for FeedVisitor<'_, S> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON array of card objects")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        while let Some(raw) = seq.next_element::<Box<RawValue>>()? {
            self.stats.scanned += 1;
            if self.sink.is_closed() {
                self.stats.stopped = true;
                return Ok(());
            }

            let keep = match serde_json::from_str::<SetAndLang>(raw.get()) {
                Ok(SetAndLang {
                    set: Some(set),
                    lang: Some(lang),
                }) => self.filter.matches(&set, &lang),
                Ok(_) => false,
                Err(e) => {
                    self.stats.malformed += 1;
                    tracing::debug!(
                        error = %e,
                        index = self.stats.scanned - 1,
                        "Skipping non-object feed element"
                    );
                    false
                }
            };
            if !keep {
                continue;
            }

            match serde_json::from_str::<CardRecord>(raw.get()) {
                Ok(record) => {
                    self.stats.matched += 1;
                    if !self.sink.accept(record) {
                        self.stats.stopped = true;
                        return Ok(());
                    }
                }
                Err(e) => {
                    self.stats.malformed += 1;
                    tracing::warn!(
                        error = %e,
                        index = self.stats.scanned - 1,
                        "Skipping malformed card record"
                    );
                }
            }
        }
        Ok(())
    }
}

/// Parse a feed from `reader`, delivering matching records to `sink`
///
/// Blocking; run it off the async executor.
pub fn read_records<R, S>(reader: R, filter: &RecordFilter, sink: &mut S) -> Result<FeedStats>
where
    R: Read,
    S: RecordSink,
{
    use serde::Deserializer as _;

    let mut stats = FeedStats::default();
    let mut de = serde_json::Deserializer::from_reader(reader);
    let result = (&mut de).deserialize_seq(FeedVisitor {
        filter,
        sink,
        stats: &mut stats,
    });

    match result {
        Ok(()) => Ok(stats),
        // leaving the array early makes the parser complain about what follows
        Err(_) if stats.stopped => Ok(stats),
        Err(e) => Err(Error::Feed(format!("after {} records: {}", stats.scanned, e))),
    }
}

/// Lazy, forward-only sequence of records matching a [`RecordFilter`]
///
/// Not restartable; opening the feed again fetches it again. Dropping the
/// stream makes the reader stop at the next element.
pub struct CardStream {
    rx: mpsc::Receiver<Result<CardRecord>>,
    reader: Option<JoinHandle<()>>,
}

impl CardStream {
    /// Stream the body of an already-opened feed response
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(response: reqwest::Response, filter: RecordFilter, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let body = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        let bridge = SyncIoBridge::new(StreamReader::new(body));

        let reader = tokio::task::spawn_blocking(move || {
            let mut tx = tx;
            let reader = std::io::BufReader::with_capacity(256 * 1024, bridge);
            match read_records(reader, &filter, &mut tx) {
                Ok(stats) => tracing::info!(
                    set = filter.set_code(),
                    lang = filter.lang(),
                    scanned = stats.scanned,
                    matched = stats.matched,
                    malformed = stats.malformed,
                    stopped = stats.stopped,
                    "Bulk feed consumed"
                ),
                Err(e) => {
                    tracing::error!(error = %e, "Bulk feed ended prematurely");
                    let _ = tx.blocking_send(Err(e));
                }
            }
        });

        Self {
            rx,
            reader: Some(reader),
        }
    }

    /// Next matching record; `None` once the feed is exhausted
    pub async fn next(&mut self) -> Option<Result<CardRecord>> {
        let item = self.rx.recv().await;
        if item.is_none()
            && let Some(reader) = self.reader.take()
            && let Err(e) = reader.await
        {
            return Some(Err(Error::Feed(format!("feed reader panicked: {e}"))));
        }
        item
    }
}
