use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use super::engine::ScanContext;
use super::queue::WorkQueue;
use crate::filters::{has_allowed_extension, is_output_file};

/// Marks the queue done when dropped, so workers are released even if the walker panics
struct CompletionGuard<'a>(&'a WorkQueue);

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.0.mark_done();
    }
}

/// The single producer: discovers candidate files and feeds the work queue
pub struct Walker<'a> {
    ctx: &'a ScanContext<'a>,
}

impl<'a> Walker<'a> {
    pub fn new(ctx: &'a ScanContext<'a>) -> Self {
        Self { ctx }
    }

    /// Walks the whole tree and returns the number of files queued.
    ///
    /// The traversal is iterative, so tree depth does not grow the call stack. Unreadable
    /// entries and directories are logged and skipped; nothing aborts the walk except
    /// cancellation.
    pub fn run(self) -> u64 {
        let ctx = self.ctx;
        let request = ctx.request;
        let _done = CompletionGuard(&ctx.queue);

        let mut builder = WalkBuilder::new(request.root());
        builder
            .standard_filters(false)
            .follow_links(request.follow_links());

        let mut queued = 0;
        for entry in builder.build() {
            if ctx.cancel.is_cancelled() {
                info!("Traversal cancelled after queueing {} files", queued);
                ctx.mark_interrupted();
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    ctx.metrics.record_entry_skipped();
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            if is_output_file(path, request.output_path()) {
                debug!("Skipping output file {}", path.display());
                continue;
            }
            if !has_allowed_extension(path, request.extensions()) {
                continue;
            }

            ctx.queue.push(entry.into_path());
            ctx.metrics.record_file_discovered();
            queued += 1;
        }

        debug!("Traversal finished, {} files queued", queued);
        queued
    }
}
