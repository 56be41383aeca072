//! Fixture-backed market data.
//!
//! Serves snapshots held in memory, typically loaded from a JSON file that
//! contains an array of [`MetricsSnapshot`] values. Used for offline runs
//! and tests.

use super::{MarketDataError, MarketDataFetcher, MetricsSnapshot};
use crate::model::item::normalize_ticker;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

/// Failure while loading a snapshot fixture file.
#[derive(Debug)]
pub enum FixtureError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidTicker(String),
}

impl Display for FixtureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read snapshots `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse snapshots `{}`: {source}", path.display())
            }
            Self::InvalidTicker(value) => write!(f, "invalid ticker `{value}` in snapshots"),
        }
    }
}

impl Error for FixtureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidTicker(_) => None,
        }
    }
}

/// In-memory snapshot source keyed by uppercase ticker.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    snapshots: HashMap<String, MetricsSnapshot>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a source from snapshots; later duplicates win.
    pub fn from_snapshots(
        snapshots: impl IntoIterator<Item = MetricsSnapshot>,
    ) -> Result<Self, FixtureError> {
        let mut source = Self::new();
        for snapshot in snapshots {
            source.insert(snapshot)?;
        }
        Ok(source)
    }

    /// Loads a JSON array of snapshots.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshots: Vec<MetricsSnapshot> =
            serde_json::from_slice(&bytes).map_err(|source| FixtureError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_snapshots(snapshots)
    }

    pub fn insert(&mut self, mut snapshot: MetricsSnapshot) -> Result<(), FixtureError> {
        let ticker = normalize_ticker(&snapshot.ticker)
            .map_err(|_| FixtureError::InvalidTicker(snapshot.ticker.clone()))?;
        snapshot.ticker = ticker.clone();
        self.snapshots.insert(ticker, snapshot);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl MarketDataFetcher for StaticMarketData {
    fn fetch(&self, ticker: &str) -> Result<MetricsSnapshot, MarketDataError> {
        self.snapshots
            .get(ticker)
            .cloned()
            .ok_or_else(|| MarketDataError::Unavailable {
                ticker: ticker.to_string(),
                reason: "no snapshot on file".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_snapshots_from_json_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"ticker": "aapl", "company_name": "Apple Inc.", "current_price": 190.5}},
               {{"ticker": "MSFT"}}]"#
        )
        .unwrap();

        let source = StaticMarketData::from_json_file(file.path()).unwrap();
        assert_eq!(source.len(), 2);
        let apple = source.fetch("AAPL").unwrap();
        assert_eq!(apple.company_name.as_deref(), Some("Apple Inc."));
        assert_eq!(apple.current_price, Some(190.5));
        assert_eq!(apple.market_cap, None);
    }

    #[test]
    fn unknown_ticker_is_unavailable() {
        let source = StaticMarketData::new();
        assert!(matches!(
            source.fetch("ZZZ"),
            Err(MarketDataError::Unavailable { .. })
        ));
    }

    #[test]
    fn rejects_invalid_fixture_ticker() {
        let err = StaticMarketData::from_snapshots([MetricsSnapshot::empty("way too long")])
            .unwrap_err();
        assert!(matches!(err, FixtureError::InvalidTicker(_)));
    }
}
