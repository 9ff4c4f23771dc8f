use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Result, params};

use super::{Store, serialize_vector};
use crate::chunk::Chunk;

/// A chunk row as stored, without a similarity score.
#[derive(Debug)]
pub struct StoredChunk {
    pub source: String,
    pub language: String,
    pub kind: String,
    pub position: usize,
    pub content: String,
    pub class_name: Option<String>,
}

impl Store {
    /// Insert or replace a document with its chunks and embeddings.
    ///
    /// Chunks and embeddings are parallel slices; re-upserting a source
    /// replaces all of its previous chunks.
    pub fn upsert_document(
        &mut self,
        source: &str,
        language: &str,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        assert_eq!(
            chunks.len(),
            embeddings.len(),
            "chunks and embeddings length mismatch"
        );

        let tx = self.conn.transaction()?;

        let doc_id: i64 = tx.query_row(
            r#"
            INSERT INTO documents (source, language, indexed_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(source) DO UPDATE SET
                language = excluded.language,
                indexed_at = CURRENT_TIMESTAMP
            RETURNING id
            "#,
            params![source, language],
            |row| row.get(0),
        )?;

        // Clean up old contents if any (re-indexing within one build)
        tx.execute(
            "DELETE FROM vec_chunks WHERE rowid IN (SELECT id FROM chunks WHERE document_id = ?)",
            params![doc_id],
        )?;
        tx.execute("DELETE FROM chunks WHERE document_id = ?", params![doc_id])?;

        for (i, chunk) in chunks.iter().enumerate() {
            let m = &chunk.metadata;
            tx.execute(
                r#"
                INSERT INTO chunks
                    (document_id, position, kind, content, class_name, chunk_index, element_name, element_count)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    doc_id,
                    i as i64,
                    m.kind.as_str(),
                    chunk.content,
                    m.class_name,
                    m.chunk_index.map(|v| v as i64),
                    m.element_name,
                    m.element_count.map(|v| v as i64),
                ],
            )?;
            let chunk_id = tx.last_insert_rowid();

            let vector_blob = serialize_vector(&embeddings[i]);
            tx.execute(
                "INSERT INTO vec_chunks (rowid, embedding) VALUES (?, ?)",
                params![chunk_id, vector_blob],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Total number of chunks in the collection.
    pub fn count(&self) -> Result<usize> {
        self.conn
            .query_row("SELECT count(*) FROM chunks", [], |row| {
                row.get::<_, i64>(0).map(|v| v as usize)
            })
    }

    /// Number of indexed documents.
    pub fn document_count(&self) -> Result<usize> {
        self.conn
            .query_row("SELECT count(*) FROM documents", [], |row| {
                row.get::<_, i64>(0).map(|v| v as usize)
            })
    }

    /// List stored chunks in document order, up to `limit`.
    pub fn list(&self, limit: usize) -> Result<Vec<StoredChunk>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT d.source, d.language, c.kind, c.position, c.content, c.class_name
            FROM chunks c
            JOIN documents d ON c.document_id = d.id
            ORDER BY d.source, c.position
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(StoredChunk {
                source: row.get(0)?,
                language: row.get(1)?,
                kind: row.get(2)?,
                position: row.get::<_, i64>(3)? as usize,
                content: row.get(4)?,
                class_name: row.get(5)?,
            })
        })?;

        rows.collect()
    }

    /// Map of source -> indexed_at for all documents in the collection.
    pub fn list_documents(&self) -> Result<Vec<(String, DateTime<Utc>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT source, indexed_at FROM documents ORDER BY source")?;
        let rows = stmt.query_map([], |row| {
            let source: String = row.get(0)?;
            let indexed_at: DateTime<Utc> = row.get(1)?;
            Ok((source, indexed_at))
        })?;
        rows.collect()
    }

    /// Whether a document with this source exists.
    pub fn contains_source(&self, source: &str) -> Result<bool> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM documents WHERE source = ?",
                params![source],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.is_some())
    }
}
