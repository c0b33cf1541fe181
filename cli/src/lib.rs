//! SiteScribe command-line shell.
//!
//! This is the thin shell that parses arguments, loads configuration and
//! drives a browser page. Scraping logic lives in the `crates/` directory.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use sitescribe_browser::{BrowserEngine, PageEnvironment};
use sitescribe_core::{AppConfig, ScrapeDocument, ScrapeOptions, ScrapeStats};
use sitescribe_scraper::{optimize_for_llm, LogSink, ScrapeOrchestrator, ScrapeReport};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sitescribe")]
#[command(about = "Extract a documentation site into a single text document")]
#[command(version)]
pub struct Cli {
    /// Page to start from
    pub url: String,

    /// Discover and extract every documentation page, not only the start page
    #[arg(short, long)]
    pub comprehensive: bool,

    /// Write the document to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Render links as plain text
    #[arg(long)]
    pub no_links: bool,

    /// Append the text of embedded frames
    #[arg(long)]
    pub embedded: bool,

    /// Skip the wait for late-loading content
    #[arg(long)]
    pub no_wait: bool,

    /// Replace typographic characters with plain ASCII
    #[arg(long)]
    pub optimize: bool,

    /// Print the document and counters as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not capture the start page as its own section
    #[arg(long)]
    pub skip_landing: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE", env = "SITESCRIBE_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Scrape options: configured defaults with command-line switches applied.
    #[must_use]
    pub fn options(&self, defaults: &ScrapeOptions) -> ScrapeOptions {
        ScrapeOptions {
            include_links: defaults.include_links && !self.no_links,
            wait_for_dynamic: defaults.wait_for_dynamic && !self.no_wait,
            include_embedded: defaults.include_embedded || self.embedded,
        }
    }

    /// Load the configuration file, environment overrides and switches.
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = AppConfig::load_from(path)
                    .with_context(|| format!("failed to load config {}", path.display()))?;
                config.apply_env_overrides();
                config.validate()?;
                config
            }
            None => AppConfig::load_with_env().context("failed to load config")?,
        };

        if self.headed {
            config.browser.headless = false;
        }
        if self.skip_landing {
            config.scraping.capture_landing_page = false;
        }
        Ok(config)
    }
}

/// Initialize tracing subscriber for logging. `RUST_LOG` wins over the
/// configured filter; output goes to stderr so stdout carries the document.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Run one session on `env`. Ctrl-C stops it and keeps the pages scraped so
/// far.
pub async fn scrape(
    env: &dyn PageEnvironment,
    config: &AppConfig,
    options: &ScrapeOptions,
    comprehensive: bool,
) -> Result<ScrapeReport> {
    let orchestrator = ScrapeOrchestrator::new(env, &LogSink, &config.scraping);

    let stop = orchestrator.stop_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; assembling the pages scraped so far");
            stop.cancel();
        }
    });

    let result = if comprehensive {
        orchestrator.run_comprehensive(options).await
    } else {
        orchestrator.run_single_page(options).await
    };
    interrupt.abort();

    result.context("scrape failed")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    document: &'a ScrapeDocument,
    stats: ScrapeStats,
    partial: bool,
    truncated: bool,
    scraped_at: String,
}

/// Text written for a finished report.
pub fn render_output(report: &ScrapeReport, optimize: bool, json: bool) -> Result<String> {
    let mut document = report.document.clone();
    if optimize {
        document.content = optimize_for_llm(&document.content);
    }

    if json {
        let output = JsonOutput {
            document: &document,
            stats: report.stats,
            partial: report.partial,
            truncated: report.truncated,
            scraped_at: report.scraped_at.to_rfc3339(),
        };
        return serde_json::to_string_pretty(&output).context("failed to serialize report");
    }
    Ok(document.content)
}

/// Write to `path`, or to stdout when no path is given.
pub fn write_output(output: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, output)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {} bytes to {}", output.len(), path.display());
        }
        None => println!("{output}"),
    }
    Ok(())
}

/// Full command: load config, launch Chromium, scrape, write the document.
pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    init_tracing(&config.general.log_filter);

    info!("Starting SiteScribe v{}", env!("CARGO_PKG_VERSION"));

    let options = cli.options(&config.scraping.defaults);
    let engine = BrowserEngine::launch(&config.browser)
        .await
        .context("failed to launch browser")?;
    let page = engine
        .open(&cli.url)
        .await
        .with_context(|| format!("failed to open {}", cli.url))?;

    let result = scrape(&page, &config, &options, cli.comprehensive).await;
    drop(page);
    if let Err(e) = engine.close().await {
        tracing::warn!("Browser did not shut down cleanly: {}", e);
    }
    let report = result?;

    let stats = &report.content_stats;
    info!(
        "{} sections, {} words, about {} min to read ({:?})",
        report.document.sections_count,
        stats.word_count,
        stats.reading_time_minutes,
        stats.complexity
    );
    if report.truncated {
        tracing::warn!("Output exceeded the size cap and was truncated");
    }

    let output = render_output(&report, cli.optimize, cli.json)?;
    write_output(&output, cli.output.as_deref())
}
