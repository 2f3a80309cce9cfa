//! Indexing into collections and question answering over them

mod indexer;
mod query_engine;

pub use indexer::{IndexReport, Indexer};
pub use query_engine::QueryEngine;
