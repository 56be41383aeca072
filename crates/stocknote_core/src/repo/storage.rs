//! Storage contract for the knowledge store.
//!
//! # Responsibility
//! - Define the whole-collection load/save seam used by `KnowledgeStore`.
//! - Define persistence errors shared by storage backends.
//!
//! # Invariants
//! - `save` replaces the whole persisted collection; there are no partial
//!   writes.
//! - `load` rejects invalid persisted state instead of masking it.

use crate::model::item::ResearchItem;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Failure while reading or writing persisted items.
#[derive(Debug)]
pub enum PersistenceError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Serialize(serde_json::Error),
    /// Persisted document exists but cannot be accepted.
    Corrupt { path: PathBuf, message: String },
    /// Writes refused because unreadable data at `location` could not be
    /// moved aside.
    ReadOnly { location: String },
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "I/O error at `{}`: {source}", path.display()),
            Self::Serialize(err) => write!(f, "failed to serialize items: {err}"),
            Self::Corrupt { path, message } => {
                write!(f, "invalid store document `{}`: {message}", path.display())
            }
            Self::ReadOnly { location } => write!(
                f,
                "store is read-only: unreadable data at `{location}` could not be moved aside"
            ),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
            Self::Corrupt { .. } | Self::ReadOnly { .. } => None,
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Whole-collection persistence backend.
pub trait ItemStorage {
    /// Loads every persisted item. A missing store is an empty collection.
    fn load(&self) -> PersistenceResult<Vec<ResearchItem>>;
    /// Replaces the persisted collection with `items`.
    fn save(&mut self, items: &[ResearchItem]) -> PersistenceResult<()>;
    /// Moves unreadable persisted state aside so it is not overwritten.
    ///
    /// Returns where the data was moved, or `None` when there was nothing to
    /// move or the backend has no durable state.
    fn quarantine(&mut self) -> PersistenceResult<Option<PathBuf>> {
        Ok(None)
    }
    /// Human-readable location for diagnostics.
    fn describe(&self) -> String;
}

/// Volatile storage for callers that do not need durability.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Vec<ResearchItem>,
    save_count: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the storage as if `items` had been persisted earlier.
    pub fn with_items(items: Vec<ResearchItem>) -> Self {
        Self {
            items,
            save_count: 0,
        }
    }

    /// Items as of the last successful save.
    pub fn saved_items(&self) -> &[ResearchItem] {
        &self.items
    }

    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl ItemStorage for MemoryStorage {
    fn load(&self) -> PersistenceResult<Vec<ResearchItem>> {
        Ok(self.items.clone())
    }

    fn save(&mut self, items: &[ResearchItem]) -> PersistenceResult<()> {
        self.items = items.to_vec();
        self.save_count += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
