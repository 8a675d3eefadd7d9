//! File filtering used by the directory walker and by request validation.
//!
//! Extension matching follows the log-scanner convention: a file qualifies when its lowercase
//! *name* ends with `.` followed by one of the allowed tokens. This means a token such as `gz`
//! accepts `app.log.gz`, and a token never matches a bare file name like `log`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::errors::unify_path;

/// Letters and digits with at least one letter, e.g. `log`, `txt`, `out2`, `7z`.
static EXTENSION_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]*[a-z][a-z0-9]*$").expect("extension token regex"));

/// Checks whether a single, already lowercased extension token is acceptable
pub fn is_valid_extension_token(token: &str) -> bool {
    EXTENSION_TOKEN.is_match(token)
}

/// Lowercases a raw token and drops one leading dot, so `.LOG` and `log` are the same token
pub fn normalize_extension_token(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    match lowered.strip_prefix('.') {
        Some(stripped) => stripped.to_string(),
        None => lowered,
    }
}

/// Checks if a file should be searched based on its extension
pub fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_lowercase();
    extensions.iter().any(|ext| {
        name.strip_suffix(ext.as_str())
            .is_some_and(|stem| stem.ends_with('.'))
    })
}

/// Checks if `path` is the output file. `output_path` must be canonical.
///
/// A walked path can reach the output through a symlinked directory, so a path with the
/// output's file name is canonicalized before comparing. Other names never touch the disk.
pub fn is_output_file(path: &Path, output_path: &Path) -> bool {
    if path == output_path {
        return true;
    }
    if path.file_name() != output_path.file_name() {
        return false;
    }
    unify_path(path) == output_path
}
