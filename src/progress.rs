use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives completion percentages (0-100) as bands are produced.
///
/// Reports are best-effort; implementations must return promptly and never
/// block the pipeline.
pub trait ProgressSink {
    fn report(&self, percent: u8);
}

/// Discards all progress reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: u8) {}
}

impl<F: Fn(u8)> ProgressSink for F {
    fn report(&self, percent: u8) {
        self(percent)
    }
}

/// Shared flag for cooperative cancellation between bands.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
