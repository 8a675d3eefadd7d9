//! Types describing what a scan produced.
//!
//! # Lifetimes of the result types
//!
//! - [`MatchedLine`] is produced by the file processor, one per matching line, in source order.
//! - [`MatchRecord`] adds provenance (worker id, directory label, file name). Records for one
//!   file are built together and handed to the result writer as a single batch, then dropped.
//! - [`RunReport`] is the only value that outlives a run. It is returned to the caller once all
//!   threads have been joined.

use serde::Serialize;
use std::fmt;
use std::path::{Path, MAIN_SEPARATOR};
use std::time::Duration;

use crate::errors::SearchResult;
use crate::metrics::ScanStats;

/// A line that contained the search text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedLine {
    /// 1-based line number within the file
    pub line_number: usize,
    /// The decoded line, without its line terminator
    pub text: String,
}

/// Where a file sits relative to the scan root, in display form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    /// `./` for the root itself, `./a/b` for nested directories
    pub relative_dir: String,
    pub file_name: String,
}

impl FileLocation {
    /// Relativizes `path` against `root`. Paths outside the root keep their full parent.
    pub fn resolve(root: &Path, path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let parent = path.parent().unwrap_or(Path::new(""));
        let relative_dir = match parent.strip_prefix(root) {
            Ok(rel) if rel.as_os_str().is_empty() => format!(".{}", MAIN_SEPARATOR),
            Ok(rel) => format!(".{}{}", MAIN_SEPARATOR, rel.display()),
            Err(_) => parent.display().to_string(),
        };

        Self {
            relative_dir,
            file_name,
        }
    }
}

/// One output line: a match plus the worker and file it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub worker_id: usize,
    pub relative_dir: String,
    pub file_name: String,
    pub line_number: usize,
    pub line: String,
}

impl MatchRecord {
    pub fn new(worker_id: usize, location: &FileLocation, matched: MatchedLine) -> Self {
        Self {
            worker_id,
            relative_dir: location.relative_dir.clone(),
            file_name: location.file_name.clone(),
            line_number: matched.line_number,
            line: matched.text,
        }
    }
}

impl fmt::Display for MatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} - {}: {}",
            self.worker_id, self.relative_dir, self.file_name, self.line
        )
    }
}

/// Completion report for one scan
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Wall time from thread start to the last join
    pub elapsed: Duration,
    /// Whether at least one batch reached the output file
    pub found: bool,
    /// Something matched but the output file was gone by the end of the run
    pub output_missing: bool,
    /// The run was cancelled or hit its deadline; results are partial
    pub cancelled: bool,
    pub stats: ScanStats,
}

impl RunReport {
    /// The summary line appended to the output file
    pub fn summary_line(&self) -> String {
        summary_line(self.elapsed)
    }

    /// Renders the report for machine consumption
    pub fn to_json(&self) -> SearchResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Formats the elapsed time the way it is written below the matches
pub fn summary_line(elapsed: Duration) -> String {
    format!("Search took {} seconds", elapsed.as_secs_f64())
}
