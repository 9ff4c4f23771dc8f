//! # DevSite — Local RAG Assistant
//!
//! Answers questions over two locally indexed corpora — free-text
//! documentation and source code — by routing each query to the right
//! corpus, checking retrieval quality, and falling back to the other
//! corpus when the first retrieval looks insufficient.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, defaults
//! - **[`store`]** — SQLite + sqlite-vec vector collections (one per corpus)
//! - **[`embedder`]** — Text embedding collaborator (Ollama or mock)
//! - **[`llm`]** — Language-model collaborator (single-shot invoke + token stream)
//! - **[`extract`]** — Structural extraction: Java brace-balanced parser,
//!   XML/Python/JS census, generic fallback
//! - **[`chunk`]** — Chunk construction: summary, element, and generic chunks
//! - **[`router`]** — DOCS/CODE/BOTH query routing and quality judgment
//! - **[`retrieval`]** — Fallback controller over the two corpora
//! - **[`chat`]** — Interactive turn loop with streamed answers
//! - **[`indexer`]** — Corpus builders (walk → extract → chunk → embed → store)

pub mod chat;
pub mod chunk;
pub mod config;
pub mod embedder;
pub mod extract;
pub mod indexer;
pub mod llm;
pub mod retrieval;
pub mod router;
pub mod store;
