use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("element handle {0} no longer refers to a live element")]
    StaleElement(u64),

    #[error("script error: {0}")]
    Script(String),

    #[error("timeout: {0}")]
    Timeout(String),
}

impl BrowserError {
    /// Failures that only affect the element being acted on.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StaleElement(_) | Self::Timeout(_))
    }
}
