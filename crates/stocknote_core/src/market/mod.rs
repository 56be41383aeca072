//! Market data collaborator.
//!
//! # Responsibility
//! - Define the metrics snapshot consumed by insight generation.
//! - Define the fetcher contract and its error type.
//!
//! # Invariants
//! - Fetchers receive and return uppercase ticker symbols.
//! - The knowledge store never depends on this module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod cache;
pub mod fixture;

/// Point-in-time financial metrics for one ticker.
///
/// Every metric is optional; providers often omit some of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub ticker: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub current_price: Option<f64>,
    pub price_change: Option<f64>,
    pub price_change_pct: Option<f64>,
    pub market_cap: Option<u64>,
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub profit_margins: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    pub volume: Option<u64>,
    pub avg_volume: Option<u64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    #[serde(default = "Utc::now")]
    pub as_of: DateTime<Utc>,
}

impl MetricsSnapshot {
    /// Snapshot with only the ticker set.
    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            company_name: None,
            sector: None,
            industry: None,
            current_price: None,
            price_change: None,
            price_change_pct: None,
            market_cap: None,
            pe_ratio: None,
            forward_pe: None,
            price_to_book: None,
            debt_to_equity: None,
            return_on_equity: None,
            profit_margins: None,
            revenue_growth: None,
            earnings_growth: None,
            dividend_yield: None,
            beta: None,
            volume: None,
            avg_volume: None,
            fifty_two_week_high: None,
            fifty_two_week_low: None,
            as_of: Utc::now(),
        }
    }
}

/// Market data failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketDataError {
    InvalidTicker(String),
    /// Provider could not supply data for the ticker.
    Unavailable { ticker: String, reason: String },
}

impl Display for MarketDataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTicker(value) => write!(f, "invalid ticker `{value}`"),
            Self::Unavailable { ticker, reason } => {
                write!(f, "market data unavailable for {ticker}: {reason}")
            }
        }
    }
}

impl Error for MarketDataError {}

/// Source of metrics snapshots.
pub trait MarketDataFetcher {
    /// Fetches a snapshot for an already-normalized ticker.
    fn fetch(&self, ticker: &str) -> Result<MetricsSnapshot, MarketDataError>;
}

impl<F: MarketDataFetcher + ?Sized> MarketDataFetcher for Box<F> {
    fn fetch(&self, ticker: &str) -> Result<MetricsSnapshot, MarketDataError> {
        (**self).fetch(ticker)
    }
}
