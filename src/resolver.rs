//! Record resolution: which images a card record implies and where they go
//!
//! [`classify`] is the single place that decides a record's image shape.
//! [`resolve`] turns that shape into zero, one or two [`DownloadTask`]s.

use crate::types::{CardRecord, DownloadTask};
use crate::utils::sanitize_filename;
use std::path::{Path, PathBuf};

/// Type line Scryfall uses for double-faced placeholder/checklist entries
pub const PLACEHOLDER_TYPE_LINE: &str = "Card // Card";

/// Layout tag of reversible cards (two faces, no top-level type line)
pub const REVERSIBLE_LAYOUT: &str = "reversible_card";

/// Directory used in list mode, regardless of each card's set
pub const LIST_DIR_NAME: &str = "CardsList";

/// The image shape of a record
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageShape<'a> {
    /// Nothing downloadable
    NoImage,
    /// One image for the whole card
    SingleImage {
        /// Large image URL
        url: &'a str,
    },
    /// Two faces, each with its own image
    FacePair {
        /// Name both files are stemmed on (the first face's)
        name: &'a str,
        /// Front face image URL
        front_url: &'a str,
        /// Rear face image URL
        rear_url: &'a str,
    },
}

/// Classify a record into exactly one [`ImageShape`]
///
/// First match wins:
/// 1. a direct image,
/// 2. a type line other than the placeholder plus two faces with images,
/// 3. the reversible layout plus two faces with images,
/// 4. otherwise nothing.
pub fn classify(record: &CardRecord) -> ImageShape<'_> {
    if let Some(url) = record.large_image() {
        return ImageShape::SingleImage { url };
    }

    let double_faced = record
        .type_line
        .as_deref()
        .is_some_and(|t| t != PLACEHOLDER_TYPE_LINE);
    let reversible = record.layout.as_deref() == Some(REVERSIBLE_LAYOUT);

    if (double_faced || reversible)
        && let Some(shape) = face_pair(record)
    {
        return shape;
    }

    ImageShape::NoImage
}

fn face_pair(record: &CardRecord) -> Option<ImageShape<'_>> {
    match record.card_faces.as_deref() {
        Some([front, rear]) => Some(ImageShape::FacePair {
            name: &front.name,
            front_url: front.large_image()?,
            rear_url: rear.large_image()?,
        }),
        _ => None,
    }
}

/// Where a record's images are collected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetDir {
    /// One subdirectory per set, named after the sanitized set name
    PerSet,
    /// A single shared [`LIST_DIR_NAME`] subdirectory
    Shared,
}

impl TargetDir {
    /// Directory under `output_root` that images of `record` land in
    pub fn directory_for(self, output_root: &Path, record: &CardRecord) -> PathBuf {
        match self {
            TargetDir::PerSet => output_root.join(sanitize_filename(&record.set_name)),
            TargetDir::Shared => output_root.join(LIST_DIR_NAME),
        }
    }
}

/// Turn a record into the downloads it implies, all targeting `dir`
///
/// Both tasks of a face pair are named after the first face, suffixed
/// `_front` and `_rear`.
pub fn resolve(record: &CardRecord, dir: &Path) -> Vec<DownloadTask> {
    let number = sanitize_filename(&record.collector_number);

    match classify(record) {
        ImageShape::NoImage => Vec::new(),
        ImageShape::SingleImage { url } => {
            let stem = format!("{}_{}", number, sanitize_filename(&record.name));
            vec![task(record, url, dir, &stem)]
        }
        ImageShape::FacePair {
            name,
            front_url,
            rear_url,
        } => {
            let stem = format!("{}_{}", number, sanitize_filename(name));
            vec![
                task(record, front_url, dir, &format!("{stem}_front")),
                task(record, rear_url, dir, &format!("{stem}_rear")),
            ]
        }
    }
}

fn task(record: &CardRecord, url: &str, dir: &Path, stem: &str) -> DownloadTask {
    DownloadTask {
        url: url.to_string(),
        destination: dir.join(format!("{stem}.jpg")),
        label: format!("{} ({} #{})", record.name, record.set, record.collector_number),
    }
}
