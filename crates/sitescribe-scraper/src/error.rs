use sitescribe_browser::BrowserError;
use sitescribe_core::{ScribeError, SessionStatus};
use thiserror::Error;

/// Failures of a scrape session.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A start request arrived while a session was running
    #[error("A scrape session is already active ({status})")]
    SessionAlreadyActive {
        /// Status of the running session
        status: SessionStatus,
    },

    /// Neither the location nor the content changed after every tactic
    #[error("Navigation to \"{title}\" produced no change after {attempts} checks")]
    NavigationTimeout {
        /// Title of the item
        title: String,
        /// Checks made across all tactics
        attempts: u32,
    },

    /// The page environment failed
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Invalid state transition or other core failure
    #[error("Core error: {0}")]
    Core(#[from] ScribeError),

    /// The session task panicked or was aborted
    #[error("Session task failed: {0}")]
    Task(String),
}

impl ScrapeError {
    /// Whether the failure concerns one element and the page is still usable.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Browser(e) if e.is_transient())
    }
}

/// Result alias for scraper operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(ScrapeError::from(BrowserError::StaleElement(7)).is_transient());
        assert!(!ScrapeError::from(BrowserError::Script("boom".into())).is_transient());
        assert!(!ScrapeError::NavigationTimeout {
            title: "Intro".into(),
            attempts: 10
        }
        .is_transient());
    }

    #[test]
    fn test_error_messages() {
        let err = ScrapeError::SessionAlreadyActive {
            status: SessionStatus::ScrapingPages,
        };
        assert_eq!(
            err.to_string(),
            "A scrape session is already active (scraping_pages)"
        );
    }
}
