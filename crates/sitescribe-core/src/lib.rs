//! SiteScribe Core - Foundation crate for the SiteScribe documentation scraper.
//!
//! This crate provides the shared data model, error handling and configuration
//! management that the browser and scraper crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Session identifiers, lifecycle status and scrape options
//! - [`profile`] - Site classification record produced by structure analysis
//! - [`page`] - Extracted pages, the assembled document and session counters
//! - [`events`] - Progress and completion payloads for the embedding application
//!
//! # Example
//!
//! ```rust
//! use sitescribe_core::{AppConfig, SessionStatus};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.scraping.limits.min_content_chars, 100);
//! assert!(SessionStatus::Idle.can_advance_to(SessionStatus::Analyzing));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod events;
pub mod page;
pub mod profile;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, GeneralConfig, LimitsConfig, ScrapingConfig, TimingConfig,
    TRUNCATION_NOTICE,
};
pub use error::{ConfigError, ConfigResult, Result, ScribeError};
pub use events::{ActionType, DetailedProgress, ScrapeEvent};
pub use page::{ExtractedPage, ScrapeDocument, ScrapeStats};
pub use profile::{
    ContentPattern, ExpandableSummary, LinkPattern, NavigationArea, NavigationStyle, SiteProfile,
    SiteType, SpecialSelector,
};
pub use types::{ScrapeOptions, SessionId, SessionStatus};
