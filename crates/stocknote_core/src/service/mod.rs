//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate storage and search into use-case level APIs.
//! - Keep presentation layers decoupled from storage details.

pub mod knowledge_store;
