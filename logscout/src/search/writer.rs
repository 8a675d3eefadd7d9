use std::fs::OpenOptions;
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use crate::errors::{SearchError, SearchResult};
use crate::results::{summary_line, MatchRecord};

/// Serializes match batches from all workers into the output file
#[derive(Debug)]
pub struct ResultWriter {
    output_path: PathBuf,
    // Held for the whole of each append; counts lines written this run
    lines_written: Mutex<u64>,
    found: AtomicBool,
}

impl ResultWriter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            lines_written: Mutex::new(0),
            found: AtomicBool::new(false),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Appends one file's matches as a contiguous block and raises the found flag.
    ///
    /// Empty batches are a no-op. On failure the found flag is left alone.
    pub fn write_batch(&self, batch: &[MatchRecord]) -> SearchResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let text = render_batch(batch);
        let mut lines_written = self
            .lines_written
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.append(&text)?;
        *lines_written += batch.len() as u64;

        if self
            .found
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!("First match written to {}", self.output_path.display());
        }
        Ok(())
    }

    /// Appends a blank line, the elapsed-time summary and a blank separator
    pub fn append_summary(&self, elapsed: Duration) -> SearchResult<()> {
        let _guard = self
            .lines_written
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.append(&format!("\n{}\n\n", summary_line(elapsed)))
    }

    /// Opens the output in append mode and hands `text` to a single `write_all`
    fn append(&self, text: &str) -> SearchResult<()> {
        let to_output_error = |e: std::io::Error| SearchError::output_error(&self.output_path, e);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_path)
            .map_err(to_output_error)?;
        file.write_all(text.as_bytes()).map_err(to_output_error)?;
        file.flush().map_err(to_output_error)
    }

    pub fn found(&self) -> bool {
        self.found.load(Ordering::Acquire)
    }

    /// Reads the found flag and resets it for the next run
    pub fn take_found(&self) -> bool {
        self.found.swap(false, Ordering::AcqRel)
    }

    /// Match lines appended since this writer was created
    pub fn lines_written(&self) -> u64 {
        *self
            .lines_written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Formats a whole batch up front so it reaches the file in one write
fn render_batch(batch: &[MatchRecord]) -> String {
    let mut text = String::with_capacity(batch.iter().map(|r| r.line.len() + 32).sum());
    for record in batch {
        // Writing into a String cannot fail
        let _ = writeln!(text, "{}", record);
    }
    text
}
