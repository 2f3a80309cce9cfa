//! Storage module for persistent vector collections
//!
//! Provides SQLite-based persistence for collections and their embedded chunks.

mod database;
mod naming;

pub use database::{cosine_similarity, CollectionStore, COSINE};
pub use naming::{collection_name_for, sanitize_collection_name};
