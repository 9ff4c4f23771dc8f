//! Retrieval orchestration with quality-gated fallback.
//!
//! One query turn moves through: route -> retrieve from the indicated
//! corpus/corpora -> quality judgment -> optional fallback retrieval from
//! the complementary corpus -> merged, provenance-tagged result. Exactly one
//! quality judgment happens per turn; the primary judgment is trusted and
//! never re-checked after fallback.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex as TokioMutex;
use tracing::{info, warn};

use crate::embedder::Embedder;
use crate::router::{Quality, RouteDecision, Router};
use crate::store::Store;

/// Characters of each chunk contributing to the quality-check sample.
const QUALITY_SAMPLE_CHUNK_CHARS: usize = 1000;

/// One of the two independent indexed collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corpus {
    Docs,
    Code,
}

impl Corpus {
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Docs => Self::Code,
            Self::Code => Self::Docs,
        }
    }
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Docs => write!(f, "docs"),
            Self::Code => write!(f, "code"),
        }
    }
}

/// A retrieved chunk tagged with its corpus of origin.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub content: String,
    pub source: String,
    pub language: String,
    pub kind: String,
    pub corpus: Corpus,
    pub similarity: f64,
}

/// Retrieval collaborator over the two corpora.
#[async_trait]
pub trait CorpusSearch: Send + Sync {
    /// Whether this corpus has a usable index.
    fn is_available(&self, corpus: Corpus) -> bool;

    /// Ranked retrieval from one corpus.
    async fn search(&self, corpus: Corpus, query: &str) -> Result<Vec<RetrievedChunk>>;
}

/// Store-backed searcher: embeds the query and ranks against the per-corpus
/// collections. A missing collection marks its corpus unavailable.
pub struct StoreSearcher {
    docs: Option<Arc<TokioMutex<Store>>>,
    code: Option<Arc<TokioMutex<Store>>>,
    embedder: Arc<dyn Embedder>,
    docs_top_k: usize,
    code_top_k: usize,
}

impl StoreSearcher {
    #[must_use]
    pub fn new(
        docs: Option<Store>,
        code: Option<Store>,
        embedder: Arc<dyn Embedder>,
        docs_top_k: usize,
        code_top_k: usize,
    ) -> Self {
        Self {
            docs: docs.map(|s| Arc::new(TokioMutex::new(s))),
            code: code.map(|s| Arc::new(TokioMutex::new(s))),
            embedder,
            docs_top_k,
            code_top_k,
        }
    }

    fn store_for(&self, corpus: Corpus) -> Option<&Arc<TokioMutex<Store>>> {
        match corpus {
            Corpus::Docs => self.docs.as_ref(),
            Corpus::Code => self.code.as_ref(),
        }
    }
}

#[async_trait]
impl CorpusSearch for StoreSearcher {
    fn is_available(&self, corpus: Corpus) -> bool {
        self.store_for(corpus).is_some()
    }

    async fn search(&self, corpus: Corpus, query: &str) -> Result<Vec<RetrievedChunk>> {
        let store = match self.store_for(corpus) {
            Some(store) => store,
            None => return Ok(Vec::new()),
        };

        let vector = self
            .embedder
            .embed(query)
            .await
            .context("failed to embed query")?;

        let top_k = match corpus {
            Corpus::Docs => self.docs_top_k,
            Corpus::Code => self.code_top_k,
        };

        let guard = store.lock().await;
        anyhow::ensure!(
            guard.dimensions() == vector.len(),
            "query embedding has {} dims but the {corpus} collection was built with {} (embedding model mismatch?)",
            vector.len(),
            guard.dimensions()
        );

        let scored = guard
            .query(&vector, top_k)
            .with_context(|| format!("search failed in {corpus} corpus"))?;

        Ok(scored
            .into_iter()
            .map(|s| RetrievedChunk {
                content: s.content,
                source: s.source,
                language: s.language,
                kind: s.kind,
                corpus,
                similarity: s.similarity,
            })
            .collect())
    }
}

/// Result of one retrieval turn.
#[derive(Debug)]
pub struct RetrievalOutcome {
    /// Merged chunks, per-corpus retrieval order preserved.
    pub chunks: Vec<RetrievedChunk>,
    pub primary: RouteDecision,
    /// Provenance label for display, e.g. "DOCS" or "DOCS+CODE".
    pub route_label: String,
    pub quality: Quality,
    pub fallback_applied: bool,
}

/// Context sample used for the quality judgment: each chunk truncated, all
/// joined by a divider.
#[must_use]
pub fn context_sample(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.content.chars().take(QUALITY_SAMPLE_CHUNK_CHARS).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Orchestrates one turn of routing, retrieval, quality check, and fallback.
pub struct FallbackController {
    router: Router,
    searcher: Arc<dyn CorpusSearch>,
}

impl FallbackController {
    #[must_use]
    pub fn new(router: Router, searcher: Arc<dyn CorpusSearch>) -> Self {
        Self { router, searcher }
    }

    /// Run the full retrieval state machine for one question.
    ///
    /// Returns `None` when no chunks could be retrieved at all (after
    /// fallback): the caller reports "no relevant information".
    pub async fn retrieve(&self, question: &str) -> Result<Option<RetrievalOutcome>> {
        let primary = self.router.route(question).await;
        info!("Primary routing: {primary}");

        let mut chunks = Vec::new();

        if matches!(primary, RouteDecision::Docs | RouteDecision::Both)
            && self.searcher.is_available(Corpus::Docs)
        {
            chunks.extend(self.searcher.search(Corpus::Docs, question).await?);
        }
        if matches!(primary, RouteDecision::Code | RouteDecision::Both)
            && self.searcher.is_available(Corpus::Code)
        {
            chunks.extend(self.searcher.search(Corpus::Code, question).await?);
        }

        let sample = context_sample(&chunks);
        let quality = self.router.check_quality(question, &sample).await;

        let mut fallback_applied = false;
        let mut route_label = primary.to_string();

        if quality == Quality::Insufficient {
            let fallback_corpus = match primary {
                RouteDecision::Docs => Some(Corpus::Code),
                RouteDecision::Code => Some(Corpus::Docs),
                RouteDecision::Both => None,
            };

            if let Some(corpus) = fallback_corpus {
                if self.searcher.is_available(corpus) {
                    warn!("Primary source ({primary}) has limited results, falling back to {corpus}");
                    chunks.extend(self.searcher.search(corpus, question).await?);
                    fallback_applied = true;
                    route_label = match primary {
                        RouteDecision::Docs => "DOCS+CODE".to_string(),
                        _ => "CODE+DOCS".to_string(),
                    };
                }
            }
        }

        if chunks.is_empty() {
            return Ok(None);
        }

        Ok(Some(RetrievalOutcome {
            chunks,
            primary,
            route_label,
            quality,
            fallback_applied,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockLlm;
    use crate::router::RouterPolicy;
    use std::sync::Mutex;

    /// In-memory searcher with scripted per-corpus results and a call log.
    struct FakeSearcher {
        docs: Vec<RetrievedChunk>,
        code: Vec<RetrievedChunk>,
        docs_available: bool,
        code_available: bool,
        calls: Mutex<Vec<Corpus>>,
    }

    impl FakeSearcher {
        fn new(docs: Vec<RetrievedChunk>, code: Vec<RetrievedChunk>) -> Self {
            Self {
                docs,
                code,
                docs_available: true,
                code_available: true,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Corpus> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CorpusSearch for FakeSearcher {
        fn is_available(&self, corpus: Corpus) -> bool {
            match corpus {
                Corpus::Docs => self.docs_available,
                Corpus::Code => self.code_available,
            }
        }

        async fn search(&self, corpus: Corpus, _query: &str) -> Result<Vec<RetrievedChunk>> {
            self.calls.lock().unwrap().push(corpus);
            Ok(match corpus {
                Corpus::Docs => self.docs.clone(),
                Corpus::Code => self.code.clone(),
            })
        }
    }

    fn doc_chunk(content: &str) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            source: "guide.md".to_string(),
            language: "md".to_string(),
            kind: "doc_chunk".to_string(),
            corpus: Corpus::Docs,
            similarity: 0.9,
        }
    }

    fn code_chunk(content: &str) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            source: "Auth.java".to_string(),
            language: "java".to_string(),
            kind: "code_chunk".to_string(),
            corpus: Corpus::Code,
            similarity: 0.8,
        }
    }

    fn long_doc() -> RetrievedChunk {
        doc_chunk(&"documentation context that is clearly long enough. ".repeat(5))
    }

    #[tokio::test]
    async fn test_sufficient_docs_no_fallback() {
        let llm = Arc::new(MockLlm::new(&["DOCS", "SUFFICIENT"]));
        let searcher = Arc::new(FakeSearcher::new(vec![long_doc()], vec![code_chunk("x")]));
        let controller = FallbackController::new(
            Router::new(llm.clone(), RouterPolicy::DocsDefault),
            searcher.clone(),
        );

        let outcome = controller.retrieve("how do I install?").await.unwrap().unwrap();
        assert_eq!(outcome.primary, RouteDecision::Docs);
        assert_eq!(outcome.route_label, "DOCS");
        assert!(!outcome.fallback_applied);
        assert!(outcome.chunks.iter().all(|c| c.corpus == Corpus::Docs));
        assert_eq!(searcher.calls(), vec![Corpus::Docs]);
        assert_eq!(llm.invocations(), 2, "one route call + one quality call");
    }

    #[tokio::test]
    async fn test_insufficient_docs_falls_back_to_code() {
        let llm = Arc::new(MockLlm::new(&["DOCS", "INSUFFICIENT"]));
        let primary_docs = vec![long_doc()];
        let fallback_code = vec![code_chunk("public void authenticate() {}")];
        let searcher = Arc::new(FakeSearcher::new(primary_docs.clone(), fallback_code));
        let controller = FallbackController::new(
            Router::new(llm.clone(), RouterPolicy::DocsDefault),
            searcher.clone(),
        );

        let outcome = controller.retrieve("how is auth implemented?").await.unwrap().unwrap();
        assert_eq!(outcome.route_label, "DOCS+CODE");
        assert!(outcome.fallback_applied);

        let code_results: Vec<&RetrievedChunk> = outcome
            .chunks
            .iter()
            .filter(|c| c.corpus == Corpus::Code)
            .collect();
        assert!(!code_results.is_empty(), "fallback adds code-tagged chunks");
        assert!(
            primary_docs
                .iter()
                .all(|p| code_results.iter().all(|c| c.content != p.content)),
            "fallback chunks were not part of the primary result set"
        );

        // Per-corpus order preserved: docs first, then appended code
        assert_eq!(outcome.chunks[0].corpus, Corpus::Docs);
        assert_eq!(outcome.chunks.last().unwrap().corpus, Corpus::Code);

        assert_eq!(searcher.calls(), vec![Corpus::Docs, Corpus::Code]);
        assert_eq!(llm.invocations(), 2, "quality is never re-checked after fallback");
    }

    #[tokio::test]
    async fn test_insufficient_code_falls_back_to_docs() {
        let llm = Arc::new(MockLlm::new(&["CODE", "INSUFFICIENT"]));
        let searcher = Arc::new(FakeSearcher::new(
            vec![long_doc()],
            vec![code_chunk(&"code context long enough to pass the gate. ".repeat(5))],
        ));
        let controller = FallbackController::new(
            Router::new(llm.clone(), RouterPolicy::DocsDefault),
            searcher.clone(),
        );

        let outcome = controller.retrieve("what does Parser do?").await.unwrap().unwrap();
        assert_eq!(outcome.route_label, "CODE+DOCS");
        assert_eq!(searcher.calls(), vec![Corpus::Code, Corpus::Docs]);
    }

    #[tokio::test]
    async fn test_both_route_never_falls_back() {
        let llm = Arc::new(MockLlm::new(&["BOTH", "INSUFFICIENT"]));
        let searcher = Arc::new(FakeSearcher::new(vec![long_doc()], vec![code_chunk("y")]));
        let controller = FallbackController::new(
            Router::new(llm.clone(), RouterPolicy::DocsDefault),
            searcher.clone(),
        );

        let outcome = controller.retrieve("explain and show").await.unwrap().unwrap();
        assert_eq!(outcome.route_label, "BOTH");
        assert!(!outcome.fallback_applied);
        assert_eq!(searcher.calls(), vec![Corpus::Docs, Corpus::Code]);
    }

    #[tokio::test]
    async fn test_empty_primary_short_circuits_quality_then_falls_back() {
        let llm = Arc::new(MockLlm::new(&["DOCS"]));
        let searcher = Arc::new(FakeSearcher::new(
            Vec::new(),
            vec![code_chunk("the only hit")],
        ));
        let controller = FallbackController::new(
            Router::new(llm.clone(), RouterPolicy::DocsDefault),
            searcher.clone(),
        );

        let outcome = controller.retrieve("anything?").await.unwrap().unwrap();
        assert!(outcome.fallback_applied);
        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(outcome.chunks[0].corpus, Corpus::Code);
        assert_eq!(
            llm.invocations(),
            1,
            "empty context short-circuits the quality call"
        );
    }

    #[tokio::test]
    async fn test_no_results_anywhere_is_none() {
        let llm = Arc::new(MockLlm::new(&["DOCS"]));
        let searcher = Arc::new(FakeSearcher::new(Vec::new(), Vec::new()));
        let controller =
            FallbackController::new(Router::new(llm, RouterPolicy::DocsDefault), searcher);

        let outcome = controller.retrieve("nothing indexed").await.unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_fallback_skipped_when_other_corpus_unavailable() {
        let llm = Arc::new(MockLlm::new(&["DOCS", "INSUFFICIENT"]));
        let mut searcher = FakeSearcher::new(vec![long_doc()], Vec::new());
        searcher.code_available = false;
        let searcher = Arc::new(searcher);
        let controller = FallbackController::new(
            Router::new(llm, RouterPolicy::DocsDefault),
            searcher.clone(),
        );

        let outcome = controller.retrieve("question").await.unwrap().unwrap();
        assert!(!outcome.fallback_applied);
        assert_eq!(outcome.route_label, "DOCS");
        assert_eq!(searcher.calls(), vec![Corpus::Docs]);
    }

    #[test]
    fn test_context_sample_truncates_and_joins() {
        let chunks = vec![doc_chunk(&"a".repeat(1500)), doc_chunk("short")];
        let sample = context_sample(&chunks);
        assert!(sample.contains("\n\n---\n\n"));
        assert!(sample.starts_with(&"a".repeat(1000)));
        assert!(!sample.contains(&"a".repeat(1001)));
    }
}
