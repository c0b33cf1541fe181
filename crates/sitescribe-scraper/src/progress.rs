//! Delivery of progress and completion events.

use sitescribe_core::{ActionType, DetailedProgress, ScrapeEvent};
use tokio::sync::mpsc::UnboundedSender;

/// Receiver side of the progress and completion channels.
pub trait ProgressSink: Send + Sync {
    /// Deliver one event. Must not block.
    fn emit(&self, event: ScrapeEvent);

    /// Shorthand for a [`ScrapeEvent::DetailedProgress`].
    fn detail(&self, progress: DetailedProgress) {
        self.emit(ScrapeEvent::DetailedProgress(progress));
    }
}

impl ProgressSink for UnboundedSender<ScrapeEvent> {
    fn emit(&self, event: ScrapeEvent) {
        if self.send(event).is_err() {
            tracing::debug!("Progress receiver dropped; event discarded");
        }
    }
}

/// Writes every event to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, event: ScrapeEvent) {
        match event {
            ScrapeEvent::Progress { percent, status } => {
                tracing::info!("[{:>3}%] {}", percent, status);
            }
            ScrapeEvent::DetailedProgress(detail) => {
                let text = detail
                    .action
                    .or(detail.current_action)
                    .unwrap_or_default();
                if text.is_empty() {
                    return;
                }
                match detail.action_type {
                    ActionType::Warning => tracing::warn!("{}", text),
                    ActionType::Error => tracing::error!("{}", text),
                    ActionType::Info | ActionType::Success => tracing::info!("{}", text),
                }
            }
            ScrapeEvent::ContentUpdate {
                section_title,
                word_count,
                ..
            } => tracing::info!("Captured \"{}\" ({} words)", section_title, word_count),
            ScrapeEvent::Complete(document) => tracing::info!(
                "Completed \"{}\": {} sections, {} words",
                document.title,
                document.sections_count,
                document.word_count
            ),
            ScrapeEvent::Error { message } => tracing::error!("Scrape failed: {}", message),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ScrapeEvent) {}
}
