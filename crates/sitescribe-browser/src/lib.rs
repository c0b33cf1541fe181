//! Page environments for the SiteScribe scraper.
//!
//! [`PageEnvironment`] is the capability surface the scraper drives: element
//! queries, activation, input dispatch, location changes and subtree
//! snapshots. [`ChromiumPage`] implements it over a headless Chromium and
//! [`StaticSite`] implements it over captured HTML held in memory.

pub mod dom;
pub mod engine;
pub mod environment;
pub mod error;
pub mod page;
mod scripts;
pub mod static_site;

pub use dom::{DomElement, DomNode};
pub use engine::BrowserEngine;
pub use environment::{
    resolve_url, strip_fragment, ElementHandle, ElementInfo, FrameContent, InputEvent,
    LocationNotice, PageEnvironment, RuntimeHints, ScrollMetrics,
};
pub use error::{BrowserError, Result};
pub use page::ChromiumPage;
pub use static_site::{Activation, Routing, StaticSite};
