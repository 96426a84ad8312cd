//! Filename derivation and path resolution for downloads.
//!
//! Filenames come from the Content-Disposition header when present, then
//! the last URL path segment, then a timestamp fallback. Names are
//! sanitized and suffixed to avoid clobbering existing files.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use url::Url;

/// Extracts a filename from a Content-Disposition header value.
///
/// Handles the common `attachment; filename="name.msu"` and unquoted
/// `filename=name.msu` forms. RFC 5987 `filename*=` values are skipped.
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    for part in header.split(';') {
        let part = part.trim();
        let Some(value) = part.strip_prefix("filename=") else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

/// Derives a filename from the URL's last path segment, or a timestamp
/// fallback when the URL has no usable segment.
pub(crate) fn fallback_filename_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back().map(str::to_string))
        .map(|s| sanitize_filename(&s))
        .filter(|s| !s.is_empty());

    match segment {
        Some(name) => name,
        None => {
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            format!("download_{timestamp}")
        }
    }
}

/// Replaces path separators and other unsafe characters with underscores.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    cleaned.trim_matches(['.', ' ']).to_string()
}

/// Creates a file under `dir` whose name does not collide with an existing
/// file, returning the open handle and its path.
///
/// Reservation is atomic (`create_new`), so concurrent transfers that
/// derive the same filename each claim a distinct file; probing with
/// `exists()` first would let two transfers create the same path. On
/// collision, inserts `_1`, `_2`, ... before the extension.
pub(crate) async fn create_unique_file(
    dir: &Path,
    filename: &str,
) -> Result<(File, PathBuf), std::io::Error> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    let candidate = dir.join(filename);
    match options.open(&candidate).await {
        Ok(file) => return Ok((file, candidate)),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
        Err(e) => return Err(e),
    }

    let (stem, extension) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    };

    for suffix in 1u32.. {
        let name = match extension {
            Some(ext) => format!("{stem}_{suffix}.{ext}"),
            None => format!("{stem}_{suffix}"),
        };
        let candidate = dir.join(name);
        match options.open(&candidate).await {
            Ok(file) => return Ok((file, candidate)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        "exhausted collision suffixes",
    ))
}
