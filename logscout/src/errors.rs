//! This module defines the error types used across logscout.
//!
//! # Error Taxonomy
//!
//! Errors fall into three groups, and only the first one ever reaches the caller of
//! [`crate::search::scan`]:
//!
//! 1. **Configuration errors** (`ConfigError`, `InvalidPattern`, `InvalidExtension`,
//!    `FileNotFound` for the input directory) are produced while turning a
//!    [`crate::config::ScanConfig`] into a [`crate::config::ScanRequest`]. The engine never
//!    starts with an invalid request.
//!
//! 2. **Per-file errors** (`FileNotFound`, `PermissionDenied`, `LineTooLong`, `IoError`) are
//!    produced by workers. They are logged and counted, and the offending file is skipped:
//!    ```rust,ignore
//!    match processor.search_file(&path) {
//!        Ok(lines) => // hand the batch to the writer,
//!        Err(e) => warn!("Skipping {}: {}", path.display(), e),
//!    }
//!    ```
//!
//! 3. **Output errors** (`OutputError`) are produced by the result writer. They are logged and
//!    counted in the run report; other workers keep going.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid search text: {0}")]
    InvalidPattern(String),
    #[error("Invalid extension list: {0}")]
    InvalidExtension(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Line {line_number} of {path} exceeds {limit} bytes")]
    LineTooLong {
        path: PathBuf,
        line_number: usize,
        limit: usize,
    },
    #[error("Failed to write results to {path}: {source}")]
    OutputError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Canonicalize the path and strip UNC prefixes so that
/// comparisons on Windows are consistent.
pub fn unify_path(original: &Path) -> PathBuf {
    let canonical = original
        .canonicalize()
        .unwrap_or_else(|_| original.to_path_buf());
    strip_unc_prefix(&canonical)
}

/// Strips the Windows UNC prefix (\\?\) from a path if present
fn strip_unc_prefix(p: &Path) -> PathBuf {
    let s = p.display().to_string();
    if let Some(stripped) = s.strip_prefix(r"\\?\") {
        PathBuf::from(stripped)
    } else {
        p.to_path_buf()
    }
}

impl SearchError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    pub fn invalid_extension(msg: impl Into<String>) -> Self {
        Self::InvalidExtension(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn line_too_long(path: impl Into<PathBuf>, line_number: usize, limit: usize) -> Self {
        Self::LineTooLong {
            path: path.into(),
            line_number,
            limit,
        }
    }

    pub fn output_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputError {
            path: path.into(),
            source,
        }
    }

    /// Maps an I/O error raised while opening or reading `path` to the most specific variant.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }
}
