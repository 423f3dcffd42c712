//! Binder gallery: a paginated HTML page over a downloaded set directory
//!
//! Works purely from the files on disk. Images are laid out in pages of
//! `columns x rows` slots, ordered by collector number, with Previous/Next
//! navigation and a click-to-enlarge overlay.

use crate::error::{Error, Result};
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Layout of one binder page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinderOptions {
    /// Image slots per row (default: 3)
    pub columns: usize,
    /// Rows per page (default: 3)
    pub rows: usize,
}

impl Default for BinderOptions {
    fn default() -> Self {
        Self {
            columns: 3,
            rows: 3,
        }
    }
}

impl BinderOptions {
    /// Images per page; zero or overflowing layouts are rejected
    fn page_size(&self) -> Result<usize> {
        if self.columns == 0 || self.rows == 0 {
            return Err(Error::Config {
                message: "binder needs at least one column and one row".to_string(),
                key: None,
            });
        }
        self.columns
            .checked_mul(self.rows)
            .ok_or_else(|| Error::Config {
                message: format!("binder layout {}x{} is too large", self.columns, self.rows),
                key: None,
            })
    }
}

/// An image file that will appear in the binder
#[derive(Clone, Debug, PartialEq, Eq)]
struct BinderImage {
    file_name: String,
    number: Option<u64>,
}

impl BinderImage {
    fn from_file_name(file_name: String) -> Option<Self> {
        let is_jpg = Path::new(&file_name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"));
        if !is_jpg || !file_name.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        let number = leading_number(&file_name);
        Some(Self { file_name, number })
    }
}

/// Numbered files first, by number, then by name
fn sort_key(image: &BinderImage) -> (bool, Option<u64>, &str) {
    (image.number.is_none(), image.number, &image.file_name)
}

/// Numeric prefix of a file name, e.g. 51 for "51_Delver_front.jpg"
fn leading_number(file_name: &str) -> Option<u64> {
    let digits: String = file_name.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Write `<set_dir>/<dir name>_Binder.html` and return its path
///
/// Only regular `.jpg` files directly inside `set_dir` whose names contain a
/// digit are included. Files without a numeric prefix sort after numbered ones.
pub fn render_binder(set_dir: &Path, options: &BinderOptions) -> Result<PathBuf> {
    let page_size = options.page_size()?;
    if !set_dir.is_dir() {
        return Err(Error::at_path(
            set_dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut images = collect_images(set_dir);
    if images.is_empty() {
        return Err(Error::Other(format!("no images in {}", set_dir.display())));
    }
    images.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let title = directory_name(set_dir);
    let html = render_html(&title, &images, options.columns, page_size)
        .map_err(|_| Error::Other("failed to render binder page".to_string()))?;

    let output = set_dir.join(format!("{title}_Binder.html"));
    std::fs::write(&output, html).map_err(|e| Error::at_path(&output, e))?;
    tracing::info!(
        path = %output.display(),
        images = images.len(),
        pages = images.len().div_ceil(page_size),
        "Binder written"
    );
    Ok(output)
}

fn collect_images(set_dir: &Path) -> Vec<BinderImage> {
    WalkDir::new(set_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter_map(BinderImage::from_file_name)
        .collect()
}

fn directory_name(set_dir: &Path) -> String {
    std::fs::canonicalize(set_dir)
        .ok()
        .as_deref()
        .unwrap_or(set_dir)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Binder".to_string())
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = r#"
body { font-family: sans-serif; background: #1e1e1e; color: #eee; margin: 0; padding: 1rem; }
h1 { text-align: center; font-weight: normal; }
.page { display: none; gap: 8px; max-width: 1100px; margin: 0 auto; }
.page.active { display: grid; }
.page img { width: 100%; border-radius: 4%; cursor: zoom-in; }
.pager { display: flex; justify-content: center; align-items: center; gap: 1rem; margin: 1rem 0; }
.pager button { padding: 0.4rem 1rem; }
#overlay { display: none; position: fixed; inset: 0; background: rgba(0, 0, 0, 0.85);
  align-items: center; justify-content: center; cursor: zoom-out; }
#overlay.open { display: flex; }
#overlay img { max-height: 95vh; max-width: 95vw; }
"#;

const SCRIPT: &str = r#"
const pages = document.querySelectorAll('.page');
const labels = document.querySelectorAll('.page-label');
let current = 0;
function show(index) {
  pages[current].classList.remove('active');
  current = (index + pages.length) % pages.length;
  pages[current].classList.add('active');
  labels.forEach(label => { label.textContent = 'Page ' + (current + 1) + ' / ' + pages.length; });
}
document.querySelectorAll('.pager .prev').forEach(b => { b.onclick = () => show(current - 1); });
document.querySelectorAll('.pager .next').forEach(b => { b.onclick = () => show(current + 1); });
const overlay = document.getElementById('overlay');
const preview = document.getElementById('preview');
document.querySelectorAll('.page img').forEach(img => {
  img.onclick = () => { preview.src = img.src; overlay.classList.add('open'); };
});
overlay.onclick = () => overlay.classList.remove('open');
show(0);
"#;

fn render_html(
    title: &str,
    images: &[BinderImage],
    columns: usize,
    page_size: usize,
) -> std::result::Result<String, fmt::Error> {
    let title = escape_html(title);
    let mut out = String::new();
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>{title} Binder</title>")?;
    writeln!(out, "<style>{STYLE}</style>")?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(out, "<h1>{title}</h1>")?;
    write_pager(&mut out)?;

    for (index, page) in images.chunks(page_size).enumerate() {
        writeln!(
            out,
            "<section class=\"page\" id=\"page-{}\" style=\"grid-template-columns: repeat({}, 1fr);\">",
            index + 1,
            columns
        )?;
        for image in page {
            let name = escape_html(&image.file_name);
            writeln!(out, "  <img src=\"{name}\" alt=\"{name}\" loading=\"lazy\">")?;
        }
        writeln!(out, "</section>")?;
    }

    write_pager(&mut out)?;
    writeln!(out, "<div id=\"overlay\"><img id=\"preview\" alt=\"\"></div>")?;
    writeln!(out, "<script>{SCRIPT}</script>")?;
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;
    Ok(out)
}

fn write_pager(out: &mut String) -> fmt::Result {
    writeln!(
        out,
        "<nav class=\"pager\"><button class=\"prev\">Previous</button><span class=\"page-label\"></span><button class=\"next\">Next</button></nav>"
    )
}
