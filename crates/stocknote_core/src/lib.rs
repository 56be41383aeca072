//! Core domain logic for StockNote, a personal stock research knowledge base.
//! This crate owns every item invariant; front ends only call into it.

pub mod config;
pub mod insight;
pub mod logging;
pub mod market;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{AppConfig, ConfigError, StoreConfig};
pub use insight::{
    select_generator, FallbackInsightGenerator, InsightError, InsightGenerator, InsightSettings,
    OfflineInsightGenerator, OpenAiInsightGenerator, StockInsight,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use market::cache::CachedMarketData;
pub use market::fixture::{FixtureError, StaticMarketData};
pub use market::{MarketDataError, MarketDataFetcher, MetricsSnapshot};
pub use model::item::{
    ItemId, ItemKind, ItemPatch, ItemValidationError, NewItem, ResearchItem,
};
pub use repo::json_store::JsonFileStorage;
pub use repo::storage::{ItemStorage, MemoryStorage, PersistenceError, PersistenceResult};
pub use search::filter::SearchQuery;
pub use search::rank::SearchHit;
pub use service::knowledge_store::{KnowledgeStore, OpenReport, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
