use rusqlite::{Result, params};

use super::{Store, serialize_vector};

/// A retrieved chunk with its cosine similarity and stored metadata.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub source: String,
    pub language: String,
    pub kind: String,
    pub content: String,
    pub similarity: f64,
    pub class_name: Option<String>,
    pub chunk_index: Option<usize>,
    pub element_name: Option<String>,
    pub element_count: Option<usize>,
}

impl Store {
    /// Rank chunks by cosine similarity to the query vector.
    pub fn query(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                d.source,
                d.language,
                c.kind,
                c.content,
                vec_distance_cosine(v.embedding, ?) as distance,
                c.class_name,
                c.chunk_index,
                c.element_name,
                c.element_count
            FROM vec_chunks v
            JOIN chunks c ON v.rowid = c.id
            JOIN documents d ON c.document_id = d.id
            ORDER BY distance ASC
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map(
            params![serialize_vector(query_vector), top_k as i64],
            |row| {
                let distance: f64 = row.get(4)?;
                Ok(ScoredChunk {
                    source: row.get(0)?,
                    language: row.get(1)?,
                    kind: row.get(2)?,
                    content: row.get(3)?,
                    similarity: 1.0 - (distance / 2.0),
                    class_name: row.get(5)?,
                    chunk_index: row.get::<_, Option<i64>>(6)?.map(|v| v as usize),
                    element_name: row.get(7)?,
                    element_count: row.get::<_, Option<i64>>(8)?.map(|v| v as usize),
                })
            },
        )?;

        rows.collect()
    }
}
