//! Utility functions for file operations and path manipulation

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Suffix of the temporary file an image is streamed into before the rename
pub const PARTIAL_SUFFIX: &str = "part";

/// Turn arbitrary text into a filesystem-safe identifier
///
/// Surrounding whitespace is trimmed, spaces become underscores, and any
/// character outside `[A-Za-z0-9_.-]` is dropped.
///
/// # Examples
///
/// ```
/// use scryfall_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename(" Frodo, Sauron's Bane "), "Frodo_Saurons_Bane");
/// assert_eq!(sanitize_filename("Lim-Dûl's Vault"), "Lim-Dls_Vault");
/// assert_eq!(sanitize_filename(""), "");
/// ```
#[must_use]
pub fn sanitize_filename(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect()
}

/// Create a directory and its parents if they do not exist yet
pub async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| Error::at_path(path, e))
}

/// Path of the temporary file used while `destination` is being written
///
/// The temporary file sits next to the destination so the final rename never
/// crosses a filesystem boundary.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use scryfall_dl::utils::partial_path;
///
/// let tmp = partial_path(Path::new("art/Alpha/1_Black_Lotus.jpg"));
/// assert_eq!(tmp, Path::new("art/Alpha/1_Black_Lotus.jpg.part"));
/// ```
#[must_use]
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    destination.with_file_name(name)
}

/// Longest response-body excerpt kept in error messages
const ERROR_BODY_LIMIT: usize = 512;

/// Turn a non-success response into [`Error::HttpStatus`], keeping a body excerpt
pub(crate) async fn http_status_error(response: reqwest::Response) -> Error {
    let url = response.url().to_string();
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map(|text| text.chars().take(ERROR_BODY_LIMIT).collect())
        .unwrap_or_default();
    Error::HttpStatus { url, status, body }
}
