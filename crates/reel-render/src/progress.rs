//! Progress event emission with monotonic percentages.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use reel_models::{RenderEvent, Stage};

/// Sends progress events for one render job.
///
/// Percentages are floored at the highest value already emitted, so a stage
/// that reports out of order (parallel chunk completions) can never walk the
/// caller's progress bar backwards. Sends are best-effort: a caller that
/// disconnected mid-job drops the receiver and the job simply runs to
/// completion unobserved.
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<RenderEvent>,
    last_percent: Arc<AtomicU8>,
}

impl ProgressSender {
    /// Create a sender and the receiver half consumed by the caller.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RenderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                last_percent: Arc::new(AtomicU8::new(0)),
            },
            rx,
        )
    }

    /// Emit a progress event at `fraction` (0..=1) through `stage`'s band.
    pub fn stage(&self, stage: Stage, fraction: f64, message: impl Into<String>) {
        let percent = stage.percent_at(fraction);
        let floored = self.last_percent.fetch_max(percent, Ordering::AcqRel).max(percent);
        let _ = self
            .tx
            .send(RenderEvent::progress(stage, floored, message));
    }

    /// Emit the terminal completion event.
    pub fn complete(&self, video_url: impl Into<String>, size: u64) {
        let _ = self.tx.send(RenderEvent::complete(video_url, size));
    }

    /// Emit the terminal error event.
    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("Emitting error event: {}", message);
        let _ = self.tx.send(RenderEvent::error(message));
    }

    /// Highest percentage emitted so far.
    pub fn last_percent(&self) -> u8 {
        self.last_percent.load(Ordering::Acquire)
    }
}
