//! Configuration management for SiteScribe.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Every heuristic threshold and wait used by
//! the scraper lives here as a named field so deployments can tune them.

use crate::error::{ConfigError, ConfigResult};
use crate::types::ScrapeOptions;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/sitescribe/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General application settings
    pub general: GeneralConfig,
    /// Scrape behavior, limits and timing
    pub scraping: ScrapingConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, using defaults if it is absent.
    pub fn load_from(config_path: &std::path::Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `SITESCRIBE_HEADLESS`: Override browser headless mode (true/false)
    /// - `SITESCRIBE_MAX_CONSECUTIVE_FAILURES`: Override the page-failure breaker
    /// - `SITESCRIBE_INCLUDE_LINKS`: Override link rendering in extracted text (true/false)
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `SITESCRIBE_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SITESCRIBE_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("SITESCRIBE_MAX_CONSECUTIVE_FAILURES") {
            if let Ok(max) = val.parse() {
                self.scraping.limits.max_consecutive_failures = max;
                tracing::debug!("Override max_consecutive_failures from env: {}", max);
            }
        }

        if let Ok(val) = std::env::var("SITESCRIBE_INCLUDE_LINKS") {
            if let Ok(include) = val.parse() {
                self.scraping.defaults.include_links = include;
                tracing::debug!("Override defaults.include_links from env: {}", include);
            }
        }
    }

    /// Reject values that would stall or disable the scrape loop.
    pub fn validate(&self) -> ConfigResult<()> {
        let limits = &self.scraping.limits;
        if limits.max_consecutive_failures == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scraping.limits.max_consecutive_failures".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if limits.truncation_reserve_bytes >= limits.max_output_bytes {
            return Err(ConfigError::InvalidValue {
                field: "scraping.limits.truncation_reserve_bytes".to_string(),
                reason: "must be smaller than max_output_bytes".to_string(),
            });
        }
        if limits.truncation_reserve_bytes < TRUNCATION_NOTICE.len() {
            return Err(ConfigError::InvalidValue {
                field: "scraping.limits.truncation_reserve_bytes".to_string(),
                reason: format!(
                    "must leave room for the {}-byte truncation notice",
                    TRUNCATION_NOTICE.len()
                ),
            });
        }
        if limits.navigation_poll_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scraping.limits.navigation_poll_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/sitescribe/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "sitescribe", "sitescribe")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_filter: "info,sitescribe=debug".to_string(),
        }
    }
}

/// Scrape behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Options used when a start request does not supply its own
    pub defaults: ScrapeOptions,
    /// Capture the page the scrape starts on as "Main Page Overview"
    pub capture_landing_page: bool,
    /// Heuristic thresholds
    pub limits: LimitsConfig,
    /// Wait and poll intervals
    pub timing: TimingConfig,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            defaults: ScrapeOptions::default(),
            capture_landing_page: true,
            limits: LimitsConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

/// Appended once when the document exceeds the output cap.
pub const TRUNCATION_NOTICE: &str = "\n\n[Content truncated due to size]";

/// Empirically tuned thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// A page must have strictly more characters than this to be kept
    pub min_content_chars: usize,
    /// Content regions with less text than this are ignored
    pub min_region_chars: usize,
    /// A content snapshot must be longer than this to count as a navigation
    pub min_changed_content_chars: usize,
    /// Consecutive per-page failures that stop the page loop
    pub max_consecutive_failures: u32,
    /// Upper bound on the assembled document content, in bytes
    pub max_output_bytes: usize,
    /// Headroom left below `max_output_bytes` for the truncation notice
    pub truncation_reserve_bytes: usize,
    /// Leading normalized characters hashed into a content fingerprint
    pub fingerprint_chars: usize,
    /// Characters of content sent in a live preview
    pub preview_chars: usize,
    /// Maximum reveal rounds before giving up on a fixpoint
    pub expansion_rounds: u32,
    /// Polls after the primary activation of a navigation item
    pub navigation_poll_attempts: u32,
    /// Polls after each fallback tactic
    pub fallback_poll_attempts: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_content_chars: 100,
            min_region_chars: 100,
            min_changed_content_chars: 100,
            max_consecutive_failures: 10,
            max_output_bytes: 50 * 1024 * 1024,
            truncation_reserve_bytes: 10_000,
            fingerprint_chars: 500,
            preview_chars: 500,
            expansion_rounds: 5,
            navigation_poll_attempts: 10,
            fallback_poll_attempts: 3,
        }
    }
}

/// Wait intervals, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause after scrolling a disclosure control into view
    pub expansion_scroll_ms: u64,
    /// Pause after activating a disclosure control
    pub expansion_animation_ms: u64,
    /// Pause between reveal rounds
    pub expansion_round_pause_ms: u64,
    /// Pause after scrolling a navigation item into view
    pub navigation_scroll_settle_ms: u64,
    /// Interval between navigation polls
    pub navigation_poll_interval_ms: u64,
    /// Pause between low-level input events of a fallback tactic
    pub fallback_event_ms: u64,
    /// Pause after a keyboard or parent activation fallback
    pub fallback_pause_ms: u64,
    /// Pause after mutating the location directly
    pub location_settle_ms: u64,
    /// Pause after a successful navigation before extracting
    pub post_navigation_settle_ms: u64,
    /// Pause between consecutive pages
    pub between_pages_ms: u64,
    /// Pause after discovery before the page loop starts
    pub discovery_settle_ms: u64,
    /// Maximum time to wait for dynamic content
    pub dynamic_max_wait_ms: u64,
    /// Interval between dynamic content checks
    pub dynamic_check_interval_ms: u64,
    /// Pause once the document has grown
    pub dynamic_growth_settle_ms: u64,
    /// Pause per lazy-loading scroll step
    pub lazy_scroll_step_ms: u64,
    /// Pause after returning to the top of the document
    pub lazy_scroll_return_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            expansion_scroll_ms: 200,
            expansion_animation_ms: 400,
            expansion_round_pause_ms: 1000,
            navigation_scroll_settle_ms: 500,
            navigation_poll_interval_ms: 800,
            fallback_event_ms: 200,
            fallback_pause_ms: 500,
            location_settle_ms: 1000,
            post_navigation_settle_ms: 1500,
            between_pages_ms: 1000,
            discovery_settle_ms: 2000,
            dynamic_max_wait_ms: 5000,
            dynamic_check_interval_ms: 500,
            dynamic_growth_settle_ms: 1000,
            lazy_scroll_step_ms: 100,
            lazy_scroll_return_ms: 500,
        }
    }
}

impl TimingConfig {
    /// Zero every wait. Used against in-memory environments that settle instantly.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            expansion_scroll_ms: 0,
            expansion_animation_ms: 0,
            expansion_round_pause_ms: 0,
            navigation_scroll_settle_ms: 0,
            navigation_poll_interval_ms: 0,
            fallback_event_ms: 0,
            fallback_pause_ms: 0,
            location_settle_ms: 0,
            post_navigation_settle_ms: 0,
            between_pages_ms: 0,
            discovery_settle_ms: 0,
            dynamic_max_wait_ms: 0,
            dynamic_check_interval_ms: 0,
            dynamic_growth_settle_ms: 0,
            lazy_scroll_step_ms: 0,
            lazy_scroll_return_ms: 0,
        }
    }

    /// Convert a millisecond field into a [`Duration`].
    #[must_use]
    pub fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
        }
    }
}
