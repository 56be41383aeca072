//! JSON document storage backend.
//!
//! # Responsibility
//! - Persist the full item collection as one JSON document on disk.
//! - Reject malformed documents at load time with `PersistenceError`.
//!
//! # Invariants
//! - Saves go through a temp file plus rename, so the document on disk is
//!   either the previous or the next full collection.
//! - Loaded records pass `ResearchItem::validate()` and ids are unique.

use super::storage::{ItemStorage, PersistenceError, PersistenceResult};
use crate::model::item::ResearchItem;
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// File name of the store document inside the storage directory.
pub const STORE_FILE_NAME: &str = "research_items.json";
const STORE_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct StoreDocumentRef<'a> {
    version: u32,
    items: &'a [ResearchItem],
}

#[derive(Deserialize)]
struct StoreDocument {
    version: u32,
    items: Vec<ResearchItem>,
}

/// Storage backed by `<storage_directory>/research_items.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
    path: PathBuf,
}

impl JsonFileStorage {
    /// Prepares storage under `dir`, creating the directory if absent.
    pub fn open(dir: impl AsRef<Path>) -> PersistenceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| PersistenceError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join(STORE_FILE_NAME);
        Ok(Self { dir, path })
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Path of the store document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{STORE_FILE_NAME}.tmp"))
    }
}

impl ItemStorage for JsonFileStorage {
    fn load(&self) -> PersistenceResult<Vec<ResearchItem>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    "event=store_load module=storage status=empty path={}",
                    self.path.display()
                );
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        decode_document(&bytes, &self.path)
    }

    fn save(&mut self, items: &[ResearchItem]) -> PersistenceResult<()> {
        let document = StoreDocumentRef {
            version: STORE_FORMAT_VERSION,
            items,
        };
        let mut bytes = serde_json::to_vec_pretty(&document)?;
        bytes.push(b'\n');

        let temp_path = self.temp_path();
        write_synced(&temp_path, &bytes)?;
        fs::rename(&temp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&temp_path);
            PersistenceError::Io {
                path: self.path.clone(),
                source,
            }
        })
    }

    fn quarantine(&mut self) -> PersistenceResult<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let target = self.dir.join(format!(
            "{STORE_FILE_NAME}.corrupt-{}",
            Utc::now().format("%Y%m%dT%H%M%S%.6fZ")
        ));
        fs::rename(&self.path, &target).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })?;
        warn!(
            "event=store_quarantine module=storage status=ok from={} to={}",
            self.path.display(),
            target.display()
        );
        Ok(Some(target))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> PersistenceResult<()> {
    let io_error = |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).map_err(io_error)?;
    file.write_all(bytes).map_err(io_error)?;
    file.sync_all().map_err(io_error)?;
    Ok(())
}

fn decode_document(bytes: &[u8], path: &Path) -> PersistenceResult<Vec<ResearchItem>> {
    let corrupt = |message: String| PersistenceError::Corrupt {
        path: path.to_path_buf(),
        message,
    };

    let document: StoreDocument =
        serde_json::from_slice(bytes).map_err(|err| corrupt(err.to_string()))?;
    if document.version != STORE_FORMAT_VERSION {
        return Err(corrupt(format!(
            "unsupported format version {} (expected {STORE_FORMAT_VERSION})",
            document.version
        )));
    }

    let mut seen = HashSet::with_capacity(document.items.len());
    for item in &document.items {
        item.validate()
            .map_err(|err| corrupt(format!("item {}: {err}", item.id)))?;
        if !seen.insert(item.id) {
            return Err(corrupt(format!("duplicate item id {}", item.id)));
        }
    }

    Ok(document.items)
}

#[cfg(test)]
mod tests {
    use super::{decode_document, JsonFileStorage, STORE_FILE_NAME};
    use crate::model::item::{NewItem, ResearchItem};
    use crate::repo::storage::{ItemStorage, PersistenceError};
    use chrono::{TimeZone, Utc};
    use std::path::Path;

    #[test]
    fn saved_document_uses_stable_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let note = ResearchItem::create(
            NewItem::note("Thesis", "Long AAPL")
                .with_tags(["Growth"])
                .with_tickers(["aapl"]),
            created,
        )
        .unwrap();
        let article = ResearchItem::create(
            NewItem::article("Services", "https://example.com/a", ""),
            created,
        )
        .unwrap();

        let mut storage = JsonFileStorage::open(dir.path()).unwrap();
        storage.save(&[note.clone(), article]).unwrap();

        let raw = std::fs::read(dir.path().join(STORE_FILE_NAME)).unwrap();
        let document: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(document["version"], 1);

        let first = &document["items"][0];
        assert_eq!(first["id"], note.id.to_string());
        assert_eq!(first["kind"], "note");
        assert_eq!(first["title"], "Thesis");
        assert_eq!(first["content"], "Long AAPL");
        assert_eq!(first["tags"], serde_json::json!(["growth"]));
        assert_eq!(first["related_tickers"], serde_json::json!(["AAPL"]));
        assert_eq!(first["created_at"], "2024-05-01T12:30:00Z");
        assert_eq!(first["updated_at"], "2024-05-01T12:30:00Z");
        assert!(first["source_url"].is_null());
        assert!(first.as_object().unwrap().contains_key("source_url"));
        assert_eq!(first.as_object().unwrap().len(), 9);

        let second = &document["items"][1];
        assert_eq!(second["kind"], "article");
        assert_eq!(second["source_url"], "https://example.com/a");
    }

    #[test]
    fn decode_rejects_unknown_version() {
        let err = decode_document(br#"{"version": 7, "items": []}"#, Path::new("x.json"))
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { message, .. } if message.contains("version 7")));
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let document = br#"{"version": 1, "items": [{
            "id": "6f1c8a52-3f61-4d7e-9a1e-2d4b8f0c9a11",
            "kind": "podcast",
            "title": "t",
            "content": "",
            "tags": [],
            "related_tickers": [],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "source_url": null
        }]}"#;
        let err = decode_document(document, Path::new("x.json")).unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { .. }));
    }

    #[test]
    fn decode_rejects_unnormalized_tags() {
        let document = br#"{"version": 1, "items": [{
            "id": "6f1c8a52-3f61-4d7e-9a1e-2d4b8f0c9a11",
            "kind": "note",
            "title": "t",
            "content": "",
            "tags": ["Growth"],
            "related_tickers": [],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "source_url": null
        }]}"#;
        let err = decode_document(document, Path::new("x.json")).unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { message, .. } if message.contains("tags")));
    }

    #[test]
    fn decode_accepts_empty_document() {
        let items = decode_document(br#"{"version": 1, "items": []}"#, Path::new("x.json"))
            .unwrap();
        assert!(items.is_empty());
    }
}
