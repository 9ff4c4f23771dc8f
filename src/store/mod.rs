//! Vector store module using SQLite and sqlite-vec.
//!
//! Each corpus (documentation, code) is one independent collection: a single
//! database file holding documents, their chunks with metadata, and the
//! embedding vectors. Index builds destroy and recreate the collection
//! wholesale; there is no incremental upsert across builds.
use std::path::Path;
use std::sync::Once;

use anyhow::{Context, Result};
use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;
use tracing::info;

pub mod documents;
pub mod search;

pub use search::ScoredChunk;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL UNIQUE,
    language TEXT NOT NULL,
    indexed_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_source ON documents(source);

CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    kind TEXT NOT NULL,
    content TEXT NOT NULL,
    class_name TEXT,
    chunk_index INTEGER,
    element_name TEXT,
    element_count INTEGER,
    FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_document_id ON chunks(document_id);
CREATE INDEX IF NOT EXISTS idx_chunk_kind ON chunks(kind);
"#;

static INIT_VEC: Once = Once::new();

/// Initialize the sqlite-vec extension. Safe to call multiple times.
fn init_sqlite_vec() {
    INIT_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// One persisted vector collection.
pub struct Store {
    pub(crate) conn: Connection,
    dimensions: usize,
}

impl Store {
    /// Create a fresh collection at `path`, destroying any existing one.
    pub fn create<P: AsRef<Path>>(path: P, dimensions: usize) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            info!("Removing old collection: {}", path.display());
            std::fs::remove_file(path)
                .with_context(|| format!("failed to remove old collection: {}", path.display()))?;
        }

        init_sqlite_vec();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to create collection: {}", path.display()))?;
        let store = Self::init(conn, dimensions)?;
        info!("Created collection: {} ({dimensions} dims)", path.display());
        Ok(store)
    }

    /// Open an existing collection; fails if none has been built yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        anyhow::ensure!(
            path.exists(),
            "collection not found at {} (run an index build first)",
            path.display()
        );

        init_sqlite_vec();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open collection: {}", path.display()))?;

        let dimensions: usize = conn
            .query_row("SELECT value FROM meta WHERE key = 'dimensions'", [], |row| {
                row.get::<_, String>(0)
            })
            .context("collection has no recorded dimensionality")?
            .parse()
            .context("invalid recorded dimensionality")?;

        Ok(Self { conn, dimensions })
    }

    /// Open an in-memory collection (useful for testing).
    pub fn open_in_memory(dimensions: usize) -> Result<Self> {
        init_sqlite_vec();
        let conn = Connection::open_in_memory().context("failed to open in-memory collection")?;
        Self::init(conn, dimensions)
    }

    fn init(conn: Connection, dimensions: usize) -> Result<Self> {
        // Verify sqlite-vec is loaded
        let vec_version: String = conn
            .query_row("SELECT vec_version()", [], |row| row.get(0))
            .context("sqlite-vec extension not available")?;
        info!("sqlite-vec version: {vec_version}");

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("failed to configure connection")?;
        conn.execute_batch(SCHEMA_SQL)
            .context("failed to initialize schema")?;
        conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS vec_chunks USING vec0(embedding FLOAT[{dimensions}]);"
        ))
        .context("failed to create vector table")?;
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('dimensions', ?)",
            [dimensions.to_string()],
        )
        .context("failed to record dimensionality")?;

        Ok(Self { conn, dimensions })
    }

    /// Dimensionality the collection was built with. Query vectors must
    /// come from the same embedding model.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Serialize a float32 vector into bytes for the vec0 virtual table.
pub fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}
