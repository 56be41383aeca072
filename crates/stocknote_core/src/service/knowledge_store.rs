//! Knowledge store service.
//!
//! # Responsibility
//! - Provide add/get/update/delete/search over research items.
//! - Keep the in-memory collection and the persisted document in lockstep.
//!
//! # Invariants
//! - Every mutation persists the full collection before it becomes visible;
//!   on a persistence failure memory keeps its pre-operation state.
//! - List and search results are ordered by `created_at DESC, id ASC`.
//! - A failed load at startup never aborts: the store starts empty, the
//!   unreadable document is moved aside and the failure is reported. When it
//!   cannot be moved aside the store refuses every write instead.

use crate::config::StoreConfig;
use crate::model::item::{
    normalize_ticker, ItemId, ItemPatch, ItemValidationError, NewItem, ResearchItem,
};
use crate::repo::json_store::JsonFileStorage;
use crate::repo::storage::{ItemStorage, PersistenceError};
use crate::search::filter::{filter_items, SearchQuery};
use crate::search::rank::{rank_items, SearchHit};
use chrono::Utc;
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Instant;

pub type StoreResult<T> = Result<T, StoreError>;

/// Error surfaced by knowledge store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Input violates an item invariant. Not retryable.
    Validation(ItemValidationError),
    /// Referenced item does not exist.
    NotFound(ItemId),
    /// Load or flush failed.
    Persistence(PersistenceError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::NotFound(id) => write!(f, "research item not found: {id}"),
            Self::Persistence(err) => write!(f, "persistence failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<ItemValidationError> for StoreError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<PersistenceError> for StoreError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

/// Outcome of opening a store.
#[derive(Debug)]
pub struct OpenReport {
    /// Number of items loaded from storage.
    pub loaded: usize,
    /// Non-fatal load failure; the store started empty when set.
    pub warning: Option<PersistenceError>,
    /// Where an unreadable document was moved, if anywhere.
    pub quarantined_to: Option<PathBuf>,
    /// Set when the unreadable document stayed in place; writes are refused.
    pub read_only: bool,
}

impl OpenReport {
    pub fn is_clean(&self) -> bool {
        self.warning.is_none()
    }
}

/// Single-user research item store over a whole-collection storage backend.
pub struct KnowledgeStore<S: ItemStorage = JsonFileStorage> {
    storage: S,
    items: Vec<ResearchItem>,
    read_only: bool,
}

impl KnowledgeStore<JsonFileStorage> {
    /// Opens the JSON-file store under `config.storage_directory`.
    ///
    /// # Errors
    /// - `Persistence` when the storage directory cannot be created.
    pub fn open(config: &StoreConfig) -> StoreResult<(Self, OpenReport)> {
        let storage = JsonFileStorage::open(&config.storage_directory)?;
        Self::with_storage(storage)
    }
}

impl<S: ItemStorage> KnowledgeStore<S> {
    /// Loads items from `storage`.
    ///
    /// A load failure is reported in [`OpenReport::warning`] and the store
    /// starts empty. The failing document is quarantined first so the next
    /// flush cannot overwrite it; if that fails too, the store opens
    /// read-only and every write returns `PersistenceError::ReadOnly`.
    pub fn with_storage(mut storage: S) -> StoreResult<(Self, OpenReport)> {
        let started_at = Instant::now();
        match storage.load() {
            Ok(items) => {
                info!(
                    "event=store_open module=store status=ok location={} items={} duration_ms={}",
                    storage.describe(),
                    items.len(),
                    started_at.elapsed().as_millis()
                );
                let report = OpenReport {
                    loaded: items.len(),
                    warning: None,
                    quarantined_to: None,
                    read_only: false,
                };
                let store = Self {
                    storage,
                    items,
                    read_only: false,
                };
                Ok((store, report))
            }
            Err(err) => {
                warn!(
                    "event=store_open module=store status=degraded location={} error_code=load_failed error={}",
                    storage.describe(),
                    err
                );
                let (quarantined_to, read_only) = match storage.quarantine() {
                    Ok(moved_to) => (moved_to, false),
                    Err(quarantine_err) => {
                        error!(
                            "event=store_open module=store status=read_only location={} error_code=quarantine_failed error={}",
                            storage.describe(),
                            quarantine_err
                        );
                        (None, true)
                    }
                };
                let report = OpenReport {
                    loaded: 0,
                    warning: Some(err),
                    quarantined_to,
                    read_only,
                };
                let store = Self {
                    storage,
                    items: Vec::new(),
                    read_only,
                };
                Ok((store, report))
            }
        }
    }

    /// Creates an item and returns its id.
    ///
    /// # Errors
    /// - `Validation` for a blank title, blank tag, bad ticker or a
    ///   `source_url` on a non-article.
    /// - `Persistence` when the flush fails; the item is not added.
    pub fn add(&mut self, input: NewItem) -> StoreResult<ItemId> {
        let item = ResearchItem::create(input, Utc::now())?;
        let id = item.id;
        let kind = item.kind;

        let mut next = self.items.clone();
        next.push(item);
        self.commit(next, "item_add")?;

        info!("event=item_add module=store status=ok id={id} kind={kind}");
        Ok(id)
    }

    /// Gets one item by id.
    pub fn get(&self, id: ItemId) -> StoreResult<ResearchItem> {
        self.find(id)
            .map(|index| self.items[index].clone())
            .ok_or(StoreError::NotFound(id))
    }

    /// Merges supplied fields into an item and returns the updated item.
    ///
    /// Unsupplied fields keep their values; `updated_at` strictly increases
    /// and `created_at` never changes.
    pub fn update(&mut self, id: ItemId, patch: ItemPatch) -> StoreResult<ResearchItem> {
        let index = self.find(id).ok_or(StoreError::NotFound(id))?;
        let updated = self.items[index].patched(patch, Utc::now())?;

        let mut next = self.items.clone();
        next[index] = updated.clone();
        self.commit(next, "item_update")?;

        info!("event=item_update module=store status=ok id={id}");
        Ok(updated)
    }

    /// Removes an item permanently.
    pub fn delete(&mut self, id: ItemId) -> StoreResult<()> {
        let index = self.find(id).ok_or(StoreError::NotFound(id))?;

        let mut next = self.items.clone();
        next.remove(index);
        self.commit(next, "item_delete")?;

        info!("event=item_delete module=store status=ok id={id}");
        Ok(())
    }

    /// Returns items matching every supplied filter, newest first.
    pub fn search(&self, query: &SearchQuery) -> Vec<ResearchItem> {
        filter_items(&self.items, query)
    }

    /// Returns every item, newest first.
    pub fn list_all(&self) -> Vec<ResearchItem> {
        self.search(&SearchQuery::new())
    }

    /// Ranks items matching `filters` by keyword relevance to `text`.
    pub fn search_ranked(&self, text: &str, filters: &SearchQuery) -> Vec<SearchHit> {
        rank_items(&self.items, text, filters, Utc::now())
    }

    /// Distinct tags across all items, sorted.
    pub fn list_tags(&self) -> Vec<String> {
        self.items
            .iter()
            .flat_map(|item| item.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Most recent items related to `ticker`, at most `limit`.
    ///
    /// An invalid ticker yields no items.
    pub fn items_for_ticker(&self, ticker: &str, limit: usize) -> Vec<ResearchItem> {
        let Ok(ticker) = normalize_ticker(ticker) else {
            return Vec::new();
        };
        let mut items = self.search(&SearchQuery::new().with_ticker(ticker));
        items.truncate(limit);
        items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Rewrites the persisted collection from memory.
    pub fn flush(&mut self) -> StoreResult<()> {
        self.ensure_writable()?;
        self.storage.save(&self.items).map_err(|err| {
            error!(
                "event=store_flush module=store status=error location={} error={}",
                self.storage.describe(),
                err
            );
            StoreError::Persistence(err)
        })
    }

    /// Flushes and releases the store. A read-only store is released
    /// without writing.
    pub fn close(mut self) -> StoreResult<()> {
        if !self.read_only {
            self.flush()?;
        }
        info!(
            "event=store_close module=store status=ok location={} items={}",
            self.storage.describe(),
            self.items.len()
        );
        Ok(())
    }

    fn find(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Persists `next` and only then makes it the live collection.
    fn commit(&mut self, next: Vec<ResearchItem>, event: &str) -> StoreResult<()> {
        self.ensure_writable()?;
        let started_at = Instant::now();
        if let Err(err) = self.storage.save(&next) {
            error!(
                "event={event} module=store status=error location={} duration_ms={} error_code=flush_failed error={}",
                self.storage.describe(),
                started_at.elapsed().as_millis(),
                err
            );
            return Err(StoreError::Persistence(err));
        }
        self.items = next;
        Ok(())
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        if self.read_only {
            return Err(StoreError::Persistence(PersistenceError::ReadOnly {
                location: self.storage.describe(),
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::storage::MemoryStorage;

    fn memory_store() -> KnowledgeStore<MemoryStorage> {
        KnowledgeStore::with_storage(MemoryStorage::new()).unwrap().0
    }

    #[test]
    fn every_mutation_flushes_once() {
        let mut store = memory_store();
        let id = store.add(NewItem::note("a", "b")).unwrap();
        store
            .update(
                id,
                ItemPatch {
                    title: Some("c".to_string()),
                    ..ItemPatch::default()
                },
            )
            .unwrap();
        store.delete(id).unwrap();
        assert_eq!(store.storage().save_count(), 3);
        assert!(store.storage().saved_items().is_empty());
    }

    #[test]
    fn failed_validation_does_not_flush() {
        let mut store = memory_store();
        let err = store.add(NewItem::note("", "b")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(ItemValidationError::EmptyTitle)));
        assert_eq!(store.storage().save_count(), 0);
    }

    #[test]
    fn list_tags_is_sorted_and_distinct() {
        let mut store = memory_store();
        store
            .add(NewItem::note("a", "").with_tags(["Value", "growth"]))
            .unwrap();
        store
            .add(NewItem::note("b", "").with_tags(["GROWTH", "dividend"]))
            .unwrap();
        assert_eq!(store.list_tags(), vec!["dividend", "growth", "value"]);
    }

    #[test]
    fn items_for_ticker_limits_and_ignores_invalid_symbols() {
        let mut store = memory_store();
        for idx in 0..4 {
            store
                .add(NewItem::note(format!("n{idx}"), "").with_tickers(["nvda"]))
                .unwrap();
        }
        assert_eq!(store.items_for_ticker("NVDA", 3).len(), 3);
        assert!(store.items_for_ticker("not a ticker", 3).is_empty());
    }
}
