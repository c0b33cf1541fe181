//! Progress and completion payloads sent to the embedding application.
//!
//! Every payload is plain serializable data.

use crate::page::{ExtractedPage, ScrapeDocument, ScrapeStats};
use serde::{Deserialize, Serialize};

/// Severity attached to a detailed progress line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Routine step
    #[default]
    Info,
    /// Something was captured
    Success,
    /// Something was skipped
    Warning,
    /// Something failed
    Error,
}

/// Counter and activity update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedProgress {
    /// Disclosure controls activated so far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded_count: Option<u32>,
    /// Candidate pages discovered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found_links: Option<u32>,
    /// Pages retained so far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraped_count: Option<u32>,
    /// Log line for the activity feed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Severity of `action`
    pub action_type: ActionType,
    /// Status line for the current step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_action: Option<String>,
}

impl DetailedProgress {
    /// An activity line of the given severity.
    #[must_use]
    pub fn action(action_type: ActionType, action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            action_type,
            ..Self::default()
        }
    }

    /// Attach the current step description.
    #[must_use]
    pub fn with_current(mut self, current: impl Into<String>) -> Self {
        self.current_action = Some(current.into());
        self
    }

    /// Attach every counter from `stats`.
    #[must_use]
    pub fn with_stats(mut self, stats: &ScrapeStats) -> Self {
        self.expanded_count = Some(stats.expanded_count);
        self.found_links = Some(stats.found_links);
        self.scraped_count = Some(stats.scraped_count);
        self
    }
}

/// Everything the engine reports outward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ScrapeEvent {
    /// Coarse progress bar update
    Progress {
        /// 0-100
        percent: u8,
        /// Human readable status
        status: String,
    },
    /// Counter and activity update
    DetailedProgress(DetailedProgress),
    /// Live preview of a retained page
    #[serde(rename_all = "camelCase")]
    ContentUpdate {
        /// Section the page belongs to
        section_title: String,
        /// Leading characters of the content
        content_preview: String,
        /// Words in the page
        word_count: usize,
    },
    /// Final document
    Complete(ScrapeDocument),
    /// Session aborted
    Error {
        /// Failure description
        message: String,
    },
}

impl ScrapeEvent {
    /// Progress update, clamping `percent` to 100.
    #[must_use]
    pub fn progress(percent: f64, status: impl Into<String>) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = percent.clamp(0.0, 100.0).round() as u8;
        Self::Progress {
            percent,
            status: status.into(),
        }
    }

    /// Preview of a retained page, cut to `preview_chars` characters.
    #[must_use]
    pub fn content_update(page: &ExtractedPage, preview_chars: usize) -> Self {
        Self::ContentUpdate {
            section_title: page.heading().to_string(),
            content_preview: page.content.chars().take(preview_chars).collect(),
            word_count: page.word_count,
        }
    }
}
