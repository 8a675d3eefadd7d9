use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::cancel::CancelToken;
use super::matcher::LineMatcher;
use super::processor::FileProcessor;
use super::queue::WorkQueue;
use super::walker::Walker;
use super::worker::Worker;
use super::writer::ResultWriter;
use crate::config::ScanRequest;
use crate::errors::SearchResult;
use crate::metrics::ScanMetrics;
use crate::results::RunReport;

/// Runs one scan to completion
pub fn scan(request: &ScanRequest) -> SearchResult<RunReport> {
    scan_with_cancel(request, &CancelToken::new())
}

/// Runs one scan that stops at the next file boundary once `cancel` fires.
/// A timeout in the request is added to the token as a deadline.
pub fn scan_with_cancel(request: &ScanRequest, cancel: &CancelToken) -> SearchResult<RunReport> {
    info!(
        "Starting scan for {:?} under {} with {} workers",
        request.search_text(),
        request.root().display(),
        request.thread_count()
    );

    let cancel = match request.timeout() {
        Some(timeout) => cancel.with_deadline(Instant::now() + timeout),
        None => cancel.clone(),
    };
    let ctx = ScanContext::new(request, cancel);

    let start = Instant::now();
    ctx.run_threads()?;
    let elapsed = start.elapsed();

    Ok(ctx.finish(elapsed))
}

/// Per-run state shared by reference with the walker and every worker
#[derive(Debug)]
pub struct ScanContext<'a> {
    pub(crate) request: &'a ScanRequest,
    pub(crate) queue: WorkQueue,
    pub(crate) processor: FileProcessor,
    pub(crate) writer: ResultWriter,
    pub(crate) metrics: ScanMetrics,
    pub(crate) cancel: CancelToken,
    interrupted: AtomicBool,
}

impl<'a> ScanContext<'a> {
    pub fn new(request: &'a ScanRequest, cancel: CancelToken) -> Self {
        let processor = FileProcessor::new(
            LineMatcher::new(request.search_text()),
            request.encoding_mode(),
            request.max_line_bytes(),
        );
        Self {
            request,
            queue: WorkQueue::new(cancel.clone()),
            processor,
            writer: ResultWriter::new(request.output_path()),
            metrics: ScanMetrics::new(),
            cancel,
            interrupted: AtomicBool::new(false),
        }
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn writer(&self) -> &ResultWriter {
        &self.writer
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Records that a thread stopped early because of cancellation
    pub(crate) fn mark_interrupted(&self) {
        self.interrupted.store(true, Ordering::Release);
    }

    /// Spawns the walker and the worker pool, then joins all of them
    fn run_threads(&self) -> SearchResult<()> {
        let worker_count = self.request.thread_count().get();

        thread::scope(|s| -> SearchResult<()> {
            let walker = Walker::new(self);
            let walker_handle = thread::Builder::new()
                .name("logscout-walker".to_string())
                .spawn_scoped(s, move || walker.run())?;

            let mut workers = Vec::with_capacity(worker_count);
            for id in 1..=worker_count {
                let worker = Worker::new(id, self);
                let handle = thread::Builder::new()
                    .name(format!("logscout-worker-{}", id))
                    .spawn_scoped(s, move || worker.run())?;
                workers.push(handle);
            }

            let mut processed = 0;
            for (index, handle) in workers.into_iter().enumerate() {
                match handle.join() {
                    Ok(count) => processed += count,
                    Err(_) => error!("Worker {} panicked", index + 1),
                }
            }
            match walker_handle.join() {
                Ok(queued) => debug!("Walker queued {} files, workers took {}", queued, processed),
                Err(_) => error!("Walker thread panicked"),
            }
            Ok(())
        })
    }

    /// Appends the summary when something matched and builds the report.
    /// The found flag is reset here, so the writer starts clean if reused.
    fn finish(&self, elapsed: Duration) -> RunReport {
        let found = self.writer.take_found();
        let output_path = self.request.output_path();
        let mut output_missing = false;

        if found {
            if output_path.exists() {
                match self.writer.append_summary(elapsed) {
                    Ok(()) => info!("Results written to {}", output_path.display()),
                    Err(e) => {
                        error!("Could not append the summary: {}", e);
                        self.metrics.record_write_failure();
                    }
                }
            } else {
                warn!(
                    "Output file {} was removed during the scan",
                    output_path.display()
                );
                output_missing = true;
            }
        } else {
            info!("No line containing {:?} was found", self.request.search_text());
        }

        let cancelled = self.interrupted.load(Ordering::Acquire);
        if cancelled {
            warn!("Scan was cancelled; results are partial");
        }

        self.metrics.log_stats();
        info!("Scan finished in {}", humantime::format_duration(elapsed));

        RunReport {
            elapsed,
            found,
            output_missing,
            cancelled,
            stats: self.metrics.get_stats(),
        }
    }
}
