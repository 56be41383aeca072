//! Domain model for research items.
//!
//! # Responsibility
//! - Define canonical data structures used by the knowledge store.
//! - Keep normalization and validation next to the data they guard.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId`.
//! - Deletion is a hard removal; there are no tombstones.

pub mod item;
