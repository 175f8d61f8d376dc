//! URL modeling and filename derivation.
//!
//! Derives display names from URL paths or Content-Disposition headers, and
//! safe local filenames for writing a handle to disk.

mod content_disposition;
mod path;
mod sanitize;

pub use content_disposition::parse_content_disposition_filename;
pub use path::{basename, filename_from_url_path};
pub use sanitize::sanitize_filename_for_linux;

/// Default filename when URL path and Content-Disposition yield nothing usable.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Display name for a remote URL before its headers are known.
pub fn name_from_url(url: &str) -> String {
    filename_from_url_path(url).unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// Derives a safe filename for saving a handle whose display name is `name`.
///
/// The result is sanitized for Linux (no `/`, NUL, or control chars; no
/// leading/trailing dots or spaces; reserved names like "." or ".." replaced).
///
/// # Examples
///
/// - `local_filename("archive.zip")` → `"archive.zip"`
/// - `local_filename("../../etc/passwd")` → `"etc_passwd"`
pub fn local_filename(name: &str) -> String {
    let sanitized = sanitize_filename_for_linux(name);
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}
