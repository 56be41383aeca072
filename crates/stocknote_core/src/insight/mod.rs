//! Insight generation from market metrics.
//!
//! # Responsibility
//! - Define the generator contract and the structured insight it returns.
//! - Choose between the live and the offline generator at construction time.
//!
//! # Invariants
//! - Research items are read-only context; generators never write back.
//! - Callers never branch on which generator is active.

use crate::market::MetricsSnapshot;
use crate::model::item::ResearchItem;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub mod offline;
pub mod openai;
pub mod parse;
pub mod prompt;

pub use offline::OfflineInsightGenerator;
pub use openai::OpenAiInsightGenerator;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Structured analysis of one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockInsight {
    pub ticker: String,
    /// Full analysis text as produced by the generator.
    pub analysis: String,
    pub summary: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub risks: Vec<String>,
    pub recommendation: String,
    /// Name of the generator that produced `analysis`.
    pub generator: String,
    /// Timestamp of the underlying snapshot.
    pub as_of: DateTime<Utc>,
}

impl StockInsight {
    /// Parses `analysis` into sections for `snapshot`.
    pub fn from_analysis(snapshot: &MetricsSnapshot, analysis: String, generator: &str) -> Self {
        let sections = parse::parse_analysis(&analysis);
        Self {
            ticker: snapshot.ticker.clone(),
            analysis,
            summary: sections.summary,
            pros: sections.pros,
            cons: sections.cons,
            risks: sections.risks,
            recommendation: sections.recommendation,
            generator: generator.to_string(),
            as_of: snapshot.as_of,
        }
    }
}

/// Insight generation failure.
#[derive(Debug)]
pub enum InsightError {
    Http(reqwest::Error),
    /// Endpoint answered with a non-success status.
    Api { status: u16, body: String },
    /// Endpoint answered without any analysis text.
    EmptyResponse,
}

impl Display for InsightError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "http error: {err}"),
            Self::Api { status, body } => write!(f, "api error {status}: {body}"),
            Self::EmptyResponse => write!(f, "api returned no analysis text"),
        }
    }
}

impl Error for InsightError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::Api { .. } => None,
            Self::EmptyResponse => None,
        }
    }
}

/// Produces a structured analysis for a snapshot.
pub trait InsightGenerator {
    fn name(&self) -> &'static str;

    /// Analyzes `snapshot`, optionally informed by the user's research.
    fn generate(
        &self,
        snapshot: &MetricsSnapshot,
        context: &[ResearchItem],
    ) -> Result<StockInsight, InsightError>;
}

impl<G: InsightGenerator + ?Sized> InsightGenerator for Box<G> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn generate(
        &self,
        snapshot: &MetricsSnapshot,
        context: &[ResearchItem],
    ) -> Result<StockInsight, InsightError> {
        (**self).generate(snapshot, context)
    }
}

/// Settings for the live generator.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightSettings {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl Default for InsightSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 800,
            temperature: 0.3,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Uses `primary`, substituting `fallback` output when `primary` fails.
pub struct FallbackInsightGenerator<P, F> {
    primary: P,
    fallback: F,
}

impl<P: InsightGenerator, F: InsightGenerator> FallbackInsightGenerator<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: InsightGenerator, F: InsightGenerator> InsightGenerator for FallbackInsightGenerator<P, F> {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    fn generate(
        &self,
        snapshot: &MetricsSnapshot,
        context: &[ResearchItem],
    ) -> Result<StockInsight, InsightError> {
        match self.primary.generate(snapshot, context) {
            Ok(insight) => Ok(insight),
            Err(err) => {
                warn!(
                    "event=insight_fallback module=insight status=degraded primary={} fallback={} ticker={} error={}",
                    self.primary.name(),
                    self.fallback.name(),
                    snapshot.ticker,
                    err
                );
                self.fallback.generate(snapshot, context)
            }
        }
    }
}

/// Picks the live generator (with offline fallback) when `api_key` is
/// present and non-blank, the offline generator otherwise.
///
/// # Errors
/// - `Http` when the live generator's HTTP client cannot be constructed.
pub fn select_generator(
    api_key: Option<&str>,
    settings: InsightSettings,
) -> Result<Box<dyn InsightGenerator>, InsightError> {
    match api_key.map(str::trim).filter(|key| !key.is_empty()) {
        Some(key) => {
            info!(
                "event=insight_select module=insight status=ok generator=openai model={}",
                settings.model
            );
            let live = OpenAiInsightGenerator::new(key, settings)?;
            Ok(Box::new(FallbackInsightGenerator::new(
                live,
                OfflineInsightGenerator::new(),
            )))
        }
        None => {
            warn!("event=insight_select module=insight status=degraded generator=offline reason=missing_api_key");
            Ok(Box::new(OfflineInsightGenerator::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingGenerator;

    impl InsightGenerator for FailingGenerator {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn generate(
            &self,
            _snapshot: &MetricsSnapshot,
            _context: &[ResearchItem],
        ) -> Result<StockInsight, InsightError> {
            Err(InsightError::EmptyResponse)
        }
    }

    #[test]
    fn fallback_substitutes_offline_analysis() {
        let generator = FallbackInsightGenerator::new(FailingGenerator, OfflineInsightGenerator);
        let insight = generator
            .generate(&MetricsSnapshot::empty("MSFT"), &[])
            .unwrap();
        assert_eq!(insight.generator, "offline");
        assert_eq!(insight.ticker, "MSFT");
        assert_eq!(generator.name(), "failing");
    }

    #[test]
    fn blank_api_key_selects_offline_generator() {
        let generator = select_generator(Some("   "), InsightSettings::default()).unwrap();
        assert_eq!(generator.name(), "offline");

        let generator = select_generator(None, InsightSettings::default()).unwrap();
        assert_eq!(generator.name(), "offline");
    }

    #[test]
    fn api_key_selects_live_generator() {
        let generator = select_generator(Some("sk-test"), InsightSettings::default()).unwrap();
        assert_eq!(generator.name(), "openai");
    }
}
