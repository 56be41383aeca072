//! Search entry points over the in-memory collection.
//!
//! # Responsibility
//! - Structured filtering with deterministic ordering (`filter`).
//! - Keyword relevance ranking (`rank`).
//!
//! Both operate on plain item slices so they stay independent of storage.

pub mod filter;
pub mod rank;
