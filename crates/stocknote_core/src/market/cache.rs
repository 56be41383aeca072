//! Caching wrapper for market data fetchers.
//!
//! # Invariants
//! - Tickers are normalized before lookup, so `aapl` and ` AAPL ` share an
//!   entry.
//! - Only successful fetches are cached.

use super::{MarketDataError, MarketDataFetcher, MetricsSnapshot};
use crate::model::item::normalize_ticker;
use log::{info, warn};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// Memoizes snapshots per ticker for the life of the wrapper.
pub struct CachedMarketData<F: MarketDataFetcher> {
    inner: F,
    cache: RefCell<HashMap<String, MetricsSnapshot>>,
}

impl<F: MarketDataFetcher> CachedMarketData<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Fetches one ticker, serving repeats from the cache.
    pub fn get(&self, ticker: &str) -> Result<MetricsSnapshot, MarketDataError> {
        let ticker = normalize_ticker(ticker)
            .map_err(|_| MarketDataError::InvalidTicker(ticker.to_string()))?;

        if let Some(snapshot) = self.cache.borrow().get(&ticker) {
            return Ok(snapshot.clone());
        }

        info!("event=market_fetch module=market status=start ticker={ticker}");
        match self.inner.fetch(&ticker) {
            Ok(snapshot) => {
                info!("event=market_fetch module=market status=ok ticker={ticker}");
                self.cache.borrow_mut().insert(ticker, snapshot.clone());
                Ok(snapshot)
            }
            Err(err) => {
                warn!("event=market_fetch module=market status=error ticker={ticker} error={err}");
                Err(err)
            }
        }
    }

    /// Fetches several tickers; each entry carries its own outcome.
    pub fn get_many<I, S>(
        &self,
        tickers: I,
    ) -> BTreeMap<String, Result<MetricsSnapshot, MarketDataError>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tickers
            .into_iter()
            .map(|ticker| {
                let ticker = ticker.as_ref();
                (ticker.to_string(), self.get(ticker))
            })
            .collect()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
        info!("event=market_cache_clear module=market status=ok");
    }

    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl<F: MarketDataFetcher> MarketDataFetcher for CachedMarketData<F> {
    fn fetch(&self, ticker: &str) -> Result<MetricsSnapshot, MarketDataError> {
        self.get(ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingFetcher {
        calls: Cell<usize>,
    }

    impl MarketDataFetcher for CountingFetcher {
        fn fetch(&self, ticker: &str) -> Result<MetricsSnapshot, MarketDataError> {
            self.calls.set(self.calls.get() + 1);
            if ticker == "FAIL" {
                return Err(MarketDataError::Unavailable {
                    ticker: ticker.to_string(),
                    reason: "offline".to_string(),
                });
            }
            Ok(MetricsSnapshot::empty(ticker))
        }
    }

    fn counting() -> CachedMarketData<CountingFetcher> {
        CachedMarketData::new(CountingFetcher {
            calls: Cell::new(0),
        })
    }

    #[test]
    fn repeat_fetches_hit_the_cache() {
        let cached = counting();
        assert_eq!(cached.get("aapl").unwrap().ticker, "AAPL");
        assert_eq!(cached.get(" AAPL ").unwrap().ticker, "AAPL");
        assert_eq!(cached.inner.calls.get(), 1);
        assert_eq!(cached.cached_len(), 1);

        cached.clear_cache();
        cached.get("AAPL").unwrap();
        assert_eq!(cached.inner.calls.get(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let cached = counting();
        assert!(cached.get("FAIL").is_err());
        assert!(cached.get("FAIL").is_err());
        assert_eq!(cached.inner.calls.get(), 2);
        assert_eq!(cached.cached_len(), 0);
    }

    #[test]
    fn invalid_ticker_never_reaches_inner_fetcher() {
        let cached = counting();
        let err = cached.get("NOT VALID").unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidTicker(_)));
        assert_eq!(cached.inner.calls.get(), 0);
    }

    #[test]
    fn get_many_reports_each_ticker() {
        let cached = counting();
        let results = cached.get_many(["MSFT", "FAIL"]);
        assert!(results["MSFT"].is_ok());
        assert!(results["FAIL"].is_err());
    }
}
