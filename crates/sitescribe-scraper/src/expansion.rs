//! Fixpoint expansion of collapsed navigation.
//!
//! Each round enumerates the disclosure controls matched by a
//! [`DisclosureSignatures`] set and activates the ones not yet opened. Rounds
//! repeat until one activates nothing or the round limit is reached.

use crate::error::Result;
use crate::progress::ProgressSink;
use once_cell::sync::Lazy;
use regex::Regex;
use sitescribe_browser::{ElementHandle, ElementInfo, InputEvent, PageEnvironment};
use sitescribe_core::{
    ActionType, DetailedProgress, ExpandableSummary, LimitsConfig, TimingConfig,
};
use std::collections::HashSet;

static SECTION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z\s]+$").expect("valid section header regex"));

/// Markup fragments that usually mean "click to open".
const ICON_MARKERS: [&str; 5] = ["\u{25B6}", "arrow", "chevron", "plus", "+"];

/// How a signature picks its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    /// Every match of the selector
    Selector(&'static str),
    /// Matches of the selector whose markup contains an `svg` icon
    WithIcon(&'static str),
}

impl Signature {
    fn selector(self) -> &'static str {
        match self {
            Self::Selector(s) | Self::WithIcon(s) => s,
        }
    }
}

/// A curated set of disclosure signatures plus the rules for acting on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisclosureSignatures {
    /// Label used in logs
    pub name: &'static str,
    /// Checked in order against every candidate control
    pub signatures: Vec<Signature>,
    /// Labels this long or longer are not disclosure controls
    pub max_text_chars: usize,
    /// Only activate elements that show a collapsed-state hint
    pub require_collapsed_hint: bool,
    /// Send Enter when a click leaves the control closed
    pub keyboard_follow_up: bool,
    /// Run one round regardless of the configured limit
    pub single_pass: bool,
}

impl DisclosureSignatures {
    /// Comprehensive pass used by the adaptive strategies.
    #[must_use]
    pub fn standard() -> Self {
        use Signature::{Selector, WithIcon};
        Self {
            name: "standard",
            signatures: vec![
                Selector("button[aria-expanded=\"false\"]"),
                Selector("[aria-expanded=\"false\"]"),
                Selector("details:not([open])"),
                Selector(".sidebar button"),
                Selector(".navigation button"),
                Selector(".docs-nav button"),
                Selector(".menu button"),
                Selector("li > button"),
                Selector("li > a[href=\"#\"]"),
                Selector("[class*=\"expand\"]"),
                Selector("[class*=\"collapse\"]"),
                Selector("[class*=\"toggle\"]"),
                WithIcon("button"),
                WithIcon("a"),
                Selector("nav [role=\"button\"]"),
                Selector(".sidebar [role=\"button\"]"),
            ],
            max_text_chars: 50,
            require_collapsed_hint: false,
            keyboard_follow_up: false,
            single_pass: false,
        }
    }

    /// Legacy pass: broader selectors, gated on collapsed-state hints, with a
    /// keyboard follow-up.
    #[must_use]
    pub fn aggressive() -> Self {
        use Signature::Selector;
        Self {
            name: "aggressive",
            signatures: vec![
                Selector("[data-testid=\"sidebar-item\"] button"),
                Selector(".sidebar button"),
                Selector("[role=\"button\"]"),
                Selector(".expandable"),
                Selector(".collapsible"),
                Selector("button[aria-expanded=\"false\"]"),
                Selector("[class*=\"expand\"]"),
                Selector("[class*=\"toggle\"]"),
                Selector("[class*=\"collapse\"]"),
                Selector("details summary"),
                Selector(".accordion-header"),
                Selector(".dropdown-toggle"),
                Selector("nav li button"),
                Selector("ul li button"),
                Selector(".nav-item button"),
                Selector("[class*=\"sidebar\"] li [role=\"button\"]"),
            ],
            max_text_chars: usize::MAX,
            require_collapsed_hint: true,
            keyboard_follow_up: true,
            single_pass: false,
        }
    }

    /// Single pass for known API reference sites.
    #[must_use]
    pub fn site_specific() -> Self {
        use Signature::Selector;
        Self {
            name: "site-specific",
            signatures: vec![
                Selector("button[aria-expanded=\"false\"]"),
                Selector("[aria-expanded=\"false\"]"),
                Selector("details:not([open])"),
                Selector(".sidebar button"),
                Selector("nav button"),
            ],
            max_text_chars: 50,
            require_collapsed_hint: false,
            keyboard_follow_up: false,
            single_pass: true,
        }
    }
}

/// Outcome of one expansion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionSummary {
    /// Reveal rounds run
    pub rounds: u32,
    /// Controls activated by this run
    pub activated: u32,
    /// A round found nothing new before the round limit
    pub reached_fixpoint: bool,
}

/// Opens collapsed navigation. Remembers what it activated, so running it
/// again only touches controls revealed since.
pub struct ExpansionEngine<'a> {
    env: &'a dyn PageEnvironment,
    sink: &'a dyn ProgressSink,
    max_rounds: u32,
    timing: TimingConfig,
    activated: HashSet<ElementHandle>,
    total: u32,
}

impl<'a> ExpansionEngine<'a> {
    /// Engine with an empty activated set.
    pub fn new(
        env: &'a dyn PageEnvironment,
        sink: &'a dyn ProgressSink,
        limits: &LimitsConfig,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            env,
            sink,
            max_rounds: limits.expansion_rounds,
            timing: timing.clone(),
            activated: HashSet::new(),
            total: 0,
        }
    }

    /// Controls activated over the engine's lifetime.
    #[must_use]
    pub fn total_activated(&self) -> u32 {
        self.total
    }

    /// Run rounds until a fixpoint or the round limit.
    pub async fn expand(&mut self, signatures: &DisclosureSignatures) -> Result<ExpansionSummary> {
        let max_rounds = if signatures.single_pass {
            1
        } else {
            self.max_rounds
        };
        let mut summary = ExpansionSummary::default();

        for round in 1..=max_rounds {
            summary.rounds = round;
            self.sink.detail(DetailedProgress::default().with_current(format!(
                "Round {round}/{max_rounds}: finding expandable sections"
            )));

            let activated = self.run_round(signatures).await?;
            summary.activated += activated;
            tracing::debug!(
                "Expansion ({}) round {}/{}: activated {}",
                signatures.name,
                round,
                max_rounds,
                activated
            );

            if activated == 0 {
                summary.reached_fixpoint = true;
                break;
            }
            if round < max_rounds {
                tokio::time::sleep(TimingConfig::ms(self.timing.expansion_round_pause_ms)).await;
            }
        }

        tracing::info!(
            "Expansion ({}) finished: {} controls over {} rounds",
            signatures.name,
            summary.activated,
            summary.rounds
        );
        Ok(summary)
    }

    async fn run_round(&mut self, signatures: &DisclosureSignatures) -> Result<u32> {
        let mut activated = 0;
        for signature in &signatures.signatures {
            let require_icon = matches!(signature, Signature::WithIcon(_));
            for element in self.env.query_all(signature.selector()).await? {
                if self.attempt(element, require_icon, signatures).await {
                    activated += 1;
                }
            }
        }
        Ok(activated)
    }

    /// Re-locate controls recorded in the site profile and open them.
    pub async fn expand_recorded(&mut self, recorded: &[ExpandableSummary]) -> Result<u32> {
        let rules = DisclosureSignatures {
            name: "recorded",
            signatures: Vec::new(),
            max_text_chars: usize::MAX,
            require_collapsed_hint: false,
            keyboard_follow_up: false,
            single_pass: true,
        };

        let mut activated = 0;
        for summary in recorded {
            let found = self.env.query_all(&summary.selector).await?;
            let Some(element) = found.get(summary.index).copied() else {
                continue;
            };
            if self.env.text_of(element).await.ok().as_deref() != Some(summary.text.as_str()) {
                tracing::debug!("Recorded control \"{}\" moved; skipping", summary.text);
                continue;
            }
            if self.attempt(element, false, &rules).await {
                activated += 1;
            }
        }
        tracing::debug!("Opened {} of {} recorded controls", activated, recorded.len());
        Ok(activated)
    }

    /// Try one element, recording it on success. Element-level failures are
    /// logged and skipped.
    async fn attempt(
        &mut self,
        element: ElementHandle,
        require_icon: bool,
        rules: &DisclosureSignatures,
    ) -> bool {
        if self.activated.contains(&element) {
            return false;
        }
        match self.try_expand(element, require_icon, rules).await {
            Ok(true) => {
                self.activated.insert(element);
                self.total += 1;
                self.sink.detail(DetailedProgress {
                    expanded_count: Some(self.total),
                    ..DetailedProgress::default()
                });
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::debug!("Skipping disclosure control {}: {}", element, e);
                false
            }
        }
    }

    /// Activate `element` if it is a closed disclosure control. Returns whether
    /// it was activated.
    async fn try_expand(
        &self,
        element: ElementHandle,
        require_icon: bool,
        signatures: &DisclosureSignatures,
    ) -> Result<bool> {
        let info = self.env.describe(element).await?;
        let len = info.text.chars().count();
        if len == 0 || len >= signatures.max_text_chars {
            return Ok(false);
        }
        if self.is_open(element, &info).await? || navigates_away(&info) {
            return Ok(false);
        }
        if require_icon && !self.env.inner_markup(element).await?.contains("<svg") {
            return Ok(false);
        }
        if signatures.require_collapsed_hint && !self.has_collapsed_hint(element, &info).await? {
            return Ok(false);
        }

        let target = if info.tag == "details" {
            match self.env.query_within(element, "summary").await?.first() {
                Some(summary) => *summary,
                None => return Ok(false),
            }
        } else {
            element
        };

        let label: String = info.text.chars().take(25).collect();
        self.sink.detail(
            DetailedProgress::action(ActionType::Info, format!("Expanding: {label}"))
                .with_current(format!("Expanding section: {label}")),
        );

        self.env.scroll_into_view(target).await?;
        tokio::time::sleep(TimingConfig::ms(self.timing.expansion_scroll_ms)).await;
        self.env.activate(target).await?;
        tokio::time::sleep(TimingConfig::ms(self.timing.expansion_animation_ms)).await;

        if signatures.keyboard_follow_up {
            let after = self.env.describe(target).await?;
            if after.attr("aria-expanded") != Some("true") {
                self.env.dispatch_input(target, InputEvent::EnterKey).await?;
                tokio::time::sleep(TimingConfig::ms(self.timing.expansion_scroll_ms)).await;
            }
        }
        Ok(true)
    }

    async fn is_open(&self, element: ElementHandle, info: &ElementInfo) -> Result<bool> {
        if info.attr("aria-expanded") == Some("true") {
            return Ok(true);
        }
        if info.tag == "details" && info.attr("open").is_some() {
            return Ok(true);
        }
        if info.tag == "summary" {
            return Ok(self.env.closest(element, "details[open]").await?.is_some());
        }
        Ok(false)
    }

    async fn has_collapsed_hint(&self, element: ElementHandle, info: &ElementInfo) -> Result<bool> {
        if info.attr("aria-expanded") == Some("false") || info.has_class("collapsed") {
            return Ok(true);
        }

        let markup = self.env.inner_markup(element).await?;
        if ICON_MARKERS.iter().any(|marker| markup.contains(marker)) {
            return Ok(true);
        }

        if let Some(item) = self.env.closest(element, "li").await? {
            if !self
                .env
                .query_within(item, ".hidden, [aria-hidden=\"true\"]")
                .await?
                .is_empty()
            {
                return Ok(true);
            }
            for list in self.env.query_within(item, "ul, ol").await? {
                if !self.env.is_visible(list).await? {
                    return Ok(true);
                }
            }
        }

        let len = info.text.chars().count();
        Ok(len > 3 && len < 30 && SECTION_HEADER.is_match(&info.text))
    }
}

/// Anchor that would leave the current page when clicked.
fn navigates_away(info: &ElementInfo) -> bool {
    if info.tag != "a" || info.attr("aria-expanded").is_some() {
        return false;
    }
    match info.attr("href") {
        None => false,
        Some(href) => {
            let href = href.trim();
            !(href.is_empty() || href.starts_with('#') || href.starts_with("javascript:"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn info(tag: &str, attrs: &[(&str, &str)]) -> ElementInfo {
        ElementInfo {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
            text: "Label".to_string(),
        }
    }

    #[test]
    fn test_navigates_away() {
        assert!(navigates_away(&info("a", &[("href", "/docs/next")])));
        assert!(!navigates_away(&info("a", &[("href", "#")])));
        assert!(!navigates_away(&info("a", &[("href", "javascript:void(0)")])));
        assert!(!navigates_away(&info(
            "a",
            &[("href", "/docs/group"), ("aria-expanded", "false")]
        )));
        assert!(!navigates_away(&info("button", &[])));
    }

    #[test]
    fn test_signature_sets() {
        assert!(DisclosureSignatures::site_specific().single_pass);
        assert!(DisclosureSignatures::aggressive().keyboard_follow_up);
        assert!(DisclosureSignatures::standard()
            .signatures
            .contains(&Signature::WithIcon("button")));
    }
}
