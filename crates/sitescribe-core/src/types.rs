//! Shared types used across SiteScribe.
//!
//! Session identifiers, the session lifecycle and the per-request options
//! received on the control channel.

use crate::error::ScribeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype for scrape session identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new random `SessionId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Parse an existing identifier.
    ///
    /// # Errors
    /// Returns error if the ID is not a valid UUID.
    pub fn new(id: impl Into<String>) -> Result<Self, ScribeError> {
        let id = id.into();
        uuid::Uuid::parse_str(&id).map_err(|e| {
            ScribeError::Validation(format!("invalid session ID '{id}': {e}"))
        })?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a scrape session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, nothing started yet
    #[default]
    Idle,
    /// Classifying the site
    Analyzing,
    /// Expanding navigation and collecting candidate pages
    Discovering,
    /// Visiting candidate pages one by one
    ScrapingPages,
    /// A stop was requested; partial results are being assembled
    Stopping,
    /// Document delivered
    Completed,
    /// Aborted by an unrecoverable error
    Failed,
}

impl SessionStatus {
    /// Whether the session has finished, successfully or not.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        use SessionStatus::{
            Analyzing, Completed, Discovering, Failed, Idle, ScrapingPages, Stopping,
        };

        if next == Failed {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Idle, Analyzing | ScrapingPages)
                | (Analyzing, Discovering)
                | (Discovering, ScrapingPages | Stopping)
                | (ScrapingPages, Completed | Stopping)
                | (Stopping, Completed)
        )
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn advance(&mut self, next: Self) -> Result<(), ScribeError> {
        if !self.can_advance_to(next) {
            return Err(ScribeError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        tracing::debug!("Session status {} -> {}", self, next);
        *self = next;
        Ok(())
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Analyzing => "analyzing",
            Self::Discovering => "discovering",
            Self::ScrapingPages => "scraping_pages",
            Self::Stopping => "stopping",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Options carried by a start request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapeOptions {
    /// Render absolute links as `[text](href)`
    pub include_links: bool,
    /// Wait for late-loading content and trigger lazy loading before extracting
    pub wait_for_dynamic: bool,
    /// Append text from embedded frames
    pub include_embedded: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            include_links: true,
            wait_for_dynamic: true,
            include_embedded: false,
        }
    }
}
