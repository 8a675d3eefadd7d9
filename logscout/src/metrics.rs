use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Tracks what the walker, workers and writer did during one run
#[derive(Debug, Default)]
pub struct ScanMetrics {
    // Walker
    files_discovered: AtomicU64,
    entries_skipped: AtomicU64,

    // Workers
    files_scanned: AtomicU64,
    files_failed: AtomicU64,
    files_matched: AtomicU64,
    matches: AtomicU64,
    bytes_scanned: AtomicU64,

    // Writer
    write_failures: AtomicU64,
}

impl ScanMetrics {
    /// Creates a new ScanMetrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a file published to the work queue
    pub fn record_file_discovered(&self) {
        self.files_discovered.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a directory entry the walker could not read
    pub fn record_entry_skipped(&self) {
        self.entries_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a file that was read to the end
    pub fn record_file_scanned(&self, bytes: u64, match_count: usize) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
        self.bytes_scanned.fetch_add(bytes, Ordering::Relaxed);
        if match_count > 0 {
            self.files_matched.fetch_add(1, Ordering::Relaxed);
            self.matches
                .fetch_add(match_count as u64, Ordering::Relaxed);
        }
    }

    /// Records a file abandoned because of an I/O error
    pub fn record_file_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a batch that could not be written to the output
    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets a snapshot of the counters
    pub fn get_stats(&self) -> ScanStats {
        ScanStats {
            files_discovered: self.files_discovered.load(Ordering::Relaxed),
            entries_skipped: self.entries_skipped.load(Ordering::Relaxed),
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            files_matched: self.files_matched.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
            bytes_scanned: self.bytes_scanned.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }

    /// Logs the counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Scan stats:\n\
             Files discovered: {}\n\
             Files scanned/failed: {}/{}\n\
             Files with matches: {}\n\
             Matching lines: {}\n\
             Bytes scanned: {}\n\
             Skipped entries: {}\n\
             Write failures: {}",
            stats.files_discovered,
            stats.files_scanned,
            stats.files_failed,
            stats.files_matched,
            stats.matches,
            stats.bytes_scanned,
            stats.entries_skipped,
            stats.write_failures
        );
    }
}

/// Counter snapshot included in the run report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub files_discovered: u64,
    pub entries_skipped: u64,
    pub files_scanned: u64,
    pub files_failed: u64,
    pub files_matched: u64,
    pub matches: u64,
    pub bytes_scanned: u64,
    pub write_failures: u64,
}

impl ScanStats {
    /// Files that were taken off the queue, whatever happened to them
    pub fn files_processed(&self) -> u64 {
        self.files_scanned + self.files_failed
    }
}
