//! Helpers for keeping span attributes and log lines short.
//!
//! Failure messages carry the full captured output; these are only for
//! the diagnostic trail written while a scenario runs.

use std::path::Path;

/// Maximum number of characters of captured output shown in a log line.
const PREVIEW_CHARS: usize = 200;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// First line-joined slice of `output`, truncated on a char boundary.
pub fn preview(output: &str) -> String {
    let flat = output.trim().replace('\n', " | ");
    if flat.chars().count() > PREVIEW_CHARS {
        let truncated: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}... (truncated)", truncated)
    } else {
        flat
    }
}
