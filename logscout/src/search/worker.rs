use std::path::{Path, PathBuf};
use tracing::{debug, error, trace, warn};

use super::engine::ScanContext;
use super::queue::Take;
use crate::results::{FileLocation, MatchRecord};

enum WorkerState {
    Idle,
    Processing(PathBuf),
    Done,
}

/// One consumer thread: takes paths off the queue until the walker is done and the queue is empty
pub struct Worker<'a> {
    id: usize,
    ctx: &'a ScanContext<'a>,
}

impl<'a> Worker<'a> {
    /// `id` is 1-based and appears in every output line this worker writes
    pub fn new(id: usize, ctx: &'a ScanContext<'a>) -> Self {
        Self { id, ctx }
    }

    /// Runs the worker loop and returns the number of files it took off the queue
    pub fn run(self) -> u64 {
        let mut processed = 0;
        let mut state = WorkerState::Idle;

        loop {
            state = match state {
                WorkerState::Idle => {
                    if self.ctx.cancel.is_cancelled() {
                        debug!("Worker {} stopping: scan cancelled", self.id);
                        let queue = &self.ctx.queue;
                        if !(queue.is_done() && queue.is_empty()) {
                            self.ctx.mark_interrupted();
                        }
                        WorkerState::Done
                    } else {
                        match self.ctx.queue.try_take() {
                            Take::Ready(path) => WorkerState::Processing(path),
                            Take::Pending => {
                                self.ctx.queue.wait_for_item_or_done();
                                WorkerState::Idle
                            }
                            Take::Drained => WorkerState::Done,
                        }
                    }
                }
                WorkerState::Processing(path) => {
                    self.process(&path);
                    processed += 1;
                    WorkerState::Idle
                }
                WorkerState::Done => break,
            };
        }

        debug!("Worker {} finished after {} files", self.id, processed);
        processed
    }

    fn process(&self, path: &Path) {
        trace!("Worker {} processing {}", self.id, path.display());
        let ctx = self.ctx;

        let scan = match ctx.processor.search_file(path) {
            Ok(scan) => scan,
            Err(e) => {
                warn!("Worker {} skipped {}: {}", self.id, path.display(), e);
                ctx.metrics.record_file_failed();
                return;
            }
        };
        ctx.metrics.record_file_scanned(scan.bytes, scan.lines.len());
        if scan.lines.is_empty() {
            return;
        }

        let location = FileLocation::resolve(ctx.request.root(), path);
        let batch: Vec<MatchRecord> = scan
            .lines
            .into_iter()
            .map(|line| MatchRecord::new(self.id, &location, line))
            .collect();

        if let Err(e) = ctx.writer.write_batch(&batch) {
            error!(
                "Worker {} could not record {} matches from {}: {}",
                self.id,
                batch.len(),
                path.display(),
                e
            );
            ctx.metrics.record_write_failure();
        }
    }
}
