//! SQLite-backed vector collections
//!
//! Each collection records the embedding model and dimensionality it was
//! created with. Chunks keep their insertion order so similarity ties resolve
//! the same way on every query.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkSource, CollectionInfo, ScoredChunk};

/// Distance metric used by every collection
pub const COSINE: &str = "cosine";

/// Chunk fields that have no column of their own
#[derive(Debug, Serialize, Deserialize)]
struct ChunkMetadata {
    segment_index: usize,
    byte_start: usize,
    byte_end: usize,
}

/// Persistent store of named vector collections
#[derive(Clone)]
pub struct CollectionStore {
    conn: Arc<Mutex<Connection>>,
}

impl CollectionStore {
    /// Create or open the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::vector_db(format!("Failed to open {}: {}", path.display(), e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;

        tracing::info!("Opened collection store at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory store
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        // journal_mode returns a row, so it cannot go through execute_batch
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        conn.execute_batch(
            r#"
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
            PRAGMA temp_store=MEMORY;

            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                metric TEXT NOT NULL,
                embedding_model TEXT NOT NULL,
                dimensions INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chunks (
                pos INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                collection TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
                document_hash TEXT NOT NULL,
                filename TEXT NOT NULL,
                seq INTEGER NOT NULL,
                page INTEGER,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection);
            CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(collection, document_hash);
            CREATE INDEX IF NOT EXISTS idx_chunks_filename ON chunks(collection, filename);
            "#,
        )?;

        Ok(())
    }

    // ==================== Collections ====================

    /// Look up a collection
    pub fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let conn = self.conn.lock();
        let info = conn
            .query_row(
                r#"
                SELECT c.name, c.metric, c.embedding_model, c.dimensions, c.created_at,
                       (SELECT COUNT(*) FROM chunks WHERE collection = c.name)
                FROM collections c
                WHERE c.name = ?1
                "#,
                params![name],
                row_to_collection,
            )
            .optional()?;
        Ok(info)
    }

    /// Create a new collection; fails if the name is taken
    pub fn create_collection(
        &self,
        name: &str,
        embedding_model: &str,
        dimensions: usize,
    ) -> Result<CollectionInfo> {
        if dimensions == 0 {
            return Err(Error::vector_db("collection dimensions must be positive"));
        }

        let created_at = Utc::now();
        let inserted = self.conn.lock().execute(
            r#"
            INSERT OR IGNORE INTO collections (name, metric, embedding_model, dimensions, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![name, COSINE, embedding_model, dimensions as i64, created_at],
        )?;

        if inserted == 0 {
            return Err(Error::vector_db(format!("collection '{}' already exists", name)));
        }

        tracing::info!(
            "Created collection {} ({}, {} dims, {})",
            name,
            embedding_model,
            dimensions,
            COSINE
        );

        Ok(CollectionInfo {
            name: name.to_string(),
            metric: COSINE.to_string(),
            embedding_model: embedding_model.to_string(),
            dimensions,
            chunk_count: 0,
            created_at,
        })
    }

    /// Open an existing collection or create it with cosine similarity
    ///
    /// An existing collection built with another model or dimensionality is
    /// an `EmbeddingMismatch`.
    pub fn get_or_create_collection(
        &self,
        name: &str,
        embedding_model: &str,
        dimensions: usize,
    ) -> Result<CollectionInfo> {
        if let Some(existing) = self.get_collection(name)? {
            check_compatible(&existing, embedding_model, dimensions)?;
            return Ok(existing);
        }

        match self.create_collection(name, embedding_model, dimensions) {
            Ok(info) => Ok(info),
            // Lost a creation race; the winner's collection is what we want
            Err(Error::VectorDb(_)) => {
                let existing = self
                    .get_collection(name)?
                    .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
                check_compatible(&existing, embedding_model, dimensions)?;
                Ok(existing)
            }
            Err(e) => Err(e),
        }
    }

    /// All collections, by name
    pub fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT c.name, c.metric, c.embedding_model, c.dimensions, c.created_at,
                   (SELECT COUNT(*) FROM chunks WHERE collection = c.name)
            FROM collections c
            ORDER BY c.name
            "#,
        )?;

        let collections = stmt
            .query_map([], row_to_collection)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(collections)
    }

    /// Drop a collection and its chunks. Returns whether it existed.
    pub fn delete_collection(&self, name: &str) -> Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chunks WHERE collection = ?1", params![name])?;
        let deleted = tx.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
        tx.commit()?;

        if deleted > 0 {
            tracing::info!("Deleted collection {}", name);
        }
        Ok(deleted > 0)
    }

    // ==================== Chunks ====================

    /// Append embedded chunks to a collection in one transaction
    pub fn add_chunks(&self, collection: &str, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        self.check_chunks(collection, chunks)?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        insert_chunks(&tx, collection, chunks)?;
        tx.commit()?;

        tracing::debug!("Added {} chunks to {}", chunks.len(), collection);
        Ok(chunks.len())
    }

    /// Swap a file's chunks for a new set in one transaction
    ///
    /// Returns `(removed, inserted)`. On any error the old chunks stay.
    pub fn replace_document(
        &self,
        collection: &str,
        filename: &str,
        chunks: &[Chunk],
    ) -> Result<(usize, usize)> {
        self.check_chunks(collection, chunks)?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM chunks WHERE collection = ?1 AND filename = ?2",
            params![collection, filename],
        )?;
        insert_chunks(&tx, collection, chunks)?;
        tx.commit()?;

        tracing::debug!(
            "Replaced {} chunks of {} in {} with {}",
            removed,
            filename,
            collection,
            chunks.len()
        );
        Ok((removed, chunks.len()))
    }

    /// Collection must exist and every embedding must match its dimensions
    fn check_chunks(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let info = self
            .get_collection(collection)?
            .ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;

        for chunk in chunks {
            if chunk.embedding.len() != info.dimensions {
                return Err(Error::EmbeddingMismatch(format!(
                    "chunk {} has {} dimensions, collection '{}' expects {}",
                    chunk.seq,
                    chunk.embedding.len(),
                    collection,
                    info.dimensions
                )));
            }
        }
        Ok(())
    }

    /// Whether content with this hash is already indexed in the collection
    pub fn contains_document(&self, collection: &str, document_hash: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .lock()
            .query_row(
                "SELECT 1 FROM chunks WHERE collection = ?1 AND document_hash = ?2 LIMIT 1",
                params![collection, document_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Number of chunks in a collection
    pub fn count(&self, collection: &str) -> Result<usize> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Exact cosine top-K over one collection
    ///
    /// Results are best first; equal scores keep insertion order.
    pub fn query(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let info = self
            .get_collection(collection)?
            .ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;

        if vector.len() != info.dimensions {
            return Err(Error::EmbeddingMismatch(format!(
                "query has {} dimensions, collection '{}' expects {}",
                vector.len(),
                collection,
                info.dimensions
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(
                r#"
                SELECT id, document_hash, filename, seq, page, content, metadata, embedding
                FROM chunks
                WHERE collection = ?1
                ORDER BY pos
                "#,
            )?;
            let rows = stmt
                .query_map(params![collection], |row| {
                    Ok(StoredChunk {
                        id: row.get(0)?,
                        document_hash: row.get(1)?,
                        filename: row.get(2)?,
                        seq: row.get(3)?,
                        page: row.get(4)?,
                        content: row.get(5)?,
                        metadata: row.get(6)?,
                        embedding: row.get(7)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut scored: Vec<(f32, StoredChunk)> = rows
            .into_iter()
            .map(|row| (cosine_similarity(vector, &decode_embedding(&row.embedding)), row))
            .collect();

        // Stable sort: ties stay in insertion order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(score, row)| {
                Ok(ScoredChunk {
                    chunk: row.into_chunk()?,
                    score,
                })
            })
            .collect()
    }
}

struct StoredChunk {
    id: String,
    document_hash: String,
    filename: String,
    seq: i64,
    page: Option<i64>,
    content: String,
    metadata: String,
    embedding: Vec<u8>,
}

impl StoredChunk {
    fn into_chunk(self) -> Result<Chunk> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| Error::vector_db(format!("corrupt chunk id '{}': {}", self.id, e)))?;
        let metadata: ChunkMetadata = serde_json::from_str(&self.metadata)?;

        Ok(Chunk {
            id,
            text: self.content,
            source: ChunkSource {
                filename: self.filename,
                document_hash: self.document_hash,
                segment_index: metadata.segment_index,
                page_number: self.page.map(|p| p as u32),
                byte_start: metadata.byte_start,
                byte_end: metadata.byte_end,
            },
            seq: self.seq as u32,
            embedding: decode_embedding(&self.embedding),
        })
    }
}

fn insert_chunks(tx: &Transaction, collection: &str, chunks: &[Chunk]) -> Result<()> {
    let mut stmt = tx.prepare(
        r#"
        INSERT INTO chunks (
            id, collection, document_hash, filename, seq, page, content, metadata, embedding
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )?;

    for chunk in chunks {
        let metadata = serde_json::to_string(&ChunkMetadata {
            segment_index: chunk.source.segment_index,
            byte_start: chunk.source.byte_start,
            byte_end: chunk.source.byte_end,
        })?;

        stmt.execute(params![
            chunk.id.to_string(),
            collection,
            chunk.source.document_hash,
            chunk.source.filename,
            chunk.seq as i64,
            chunk.source.page_number.map(|p| p as i64),
            chunk.text,
            metadata,
            encode_embedding(&chunk.embedding),
        ])?;
    }
    Ok(())
}

fn row_to_collection(row: &rusqlite::Row) -> rusqlite::Result<CollectionInfo> {
    let dimensions: i64 = row.get(3)?;
    let created_at: DateTime<Utc> = row.get(4)?;
    let chunk_count: i64 = row.get(5)?;
    Ok(CollectionInfo {
        name: row.get(0)?,
        metric: row.get(1)?,
        embedding_model: row.get(2)?,
        dimensions: dimensions as usize,
        chunk_count: chunk_count as usize,
        created_at,
    })
}

fn check_compatible(info: &CollectionInfo, embedding_model: &str, dimensions: usize) -> Result<()> {
    if info.embedding_model != embedding_model || info.dimensions != dimensions {
        return Err(Error::EmbeddingMismatch(format!(
            "collection '{}' was built with {} ({} dims), not {} ({} dims)",
            info.name, info.embedding_model, info.dimensions, embedding_model, dimensions
        )));
    }
    Ok(())
}

/// Little-endian f32 array
fn encode_embedding(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine similarity; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
