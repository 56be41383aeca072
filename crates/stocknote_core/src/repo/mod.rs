//! Persistence backends for research items.
//!
//! # Responsibility
//! - Define the whole-collection storage contract used by the store service.
//! - Keep file layout and serialization details inside the storage boundary.
//!
//! # Invariants
//! - Backends return semantic `PersistenceError::Corrupt` for invalid
//!   persisted state in addition to raw I/O errors.

pub mod json_store;
pub mod storage;
