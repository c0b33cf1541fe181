//! SiteScribe Scraper - Adaptive documentation site exploration.
//!
//! This crate turns a documentation site with unknown markup conventions into
//! a deduplicated text corpus. It classifies the site's navigation idiom,
//! opens collapsed navigation, enumerates content pages, drives client-side
//! routing by simulating input, and extracts normalized text from each page.
//!
//! # Features
//!
//! - Site structure analysis into a plain-data [`SiteProfile`](sitescribe_core::SiteProfile)
//! - Fixpoint expansion of disclosure controls with per-site signature sets
//! - Discovery strategies selected once per session from the profile
//! - Navigation with a fallback chain of pointer, keyboard, parent and
//!   location tactics
//! - URL, title and content-fingerprint deduplication
//! - Cooperative cancellation and a consecutive-failure breaker
//!
//! # Example
//!
//! ```rust,ignore
//! use sitescribe_scraper::{LogSink, ScrapeOrchestrator};
//!
//! let page = engine.open("https://docs.example.com").await?;
//! let orchestrator = ScrapeOrchestrator::new(&page, &LogSink, &config.scraping);
//! let report = orchestrator
//!     .run_comprehensive(&config.scraping.defaults)
//!     .await?;
//! println!("{}", report.document.content);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod analyzer;
#[allow(missing_docs)]
pub mod classifier;
pub mod controller;
#[allow(missing_docs)]
pub mod dedup;
#[allow(missing_docs)]
pub mod discovery;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod expansion;
#[allow(missing_docs)]
pub mod extractor;
#[allow(missing_docs)]
pub mod navigation;
pub mod orchestrator;
#[allow(missing_docs)]
pub mod progress;
#[allow(missing_docs)]
pub mod session;
#[allow(missing_docs)]
pub mod text;

// Re-export commonly used types
pub use analyzer::SiteAnalyzer;
pub use classifier::{LinkClassifier, LinkContext};
pub use controller::{ControlRequest, ControlResponse, ScrapeController};
pub use dedup::Deduplicator;
pub use discovery::{
    DiscoveredLink, DiscoveryContext, DiscoveryStrategy, LegacyDiscovery, NavigableItem,
};
pub use error::{Result, ScrapeError};
pub use expansion::{DisclosureSignatures, ExpansionEngine, ExpansionSummary};
pub use extractor::{render_subtree, PageExtractor, RenderOptions};
pub use navigation::{NavigationOutcome, Navigator};
pub use orchestrator::{ScrapeOrchestrator, ScrapeReport, StopReason};
pub use progress::{LogSink, NullSink, ProgressSink};
pub use session::ScrapeSession;
pub use text::{analyze_content, normalize_text, optimize_for_llm, ContentStats};
