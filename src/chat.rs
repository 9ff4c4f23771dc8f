//! Interactive chat surface.
//!
//! One query per turn: route, retrieve (with fallback), assemble the
//! grounded prompt, stream the answer, then record the turn. Conversation
//! history is append-only and only ever appended after a turn fully
//! completes; a generation failure aborts the turn without touching it.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::llm::LanguageModel;
use crate::retrieval::{Corpus, FallbackController, RetrievalOutcome};

/// Characters of each chunk included in the answer context.
const ANSWER_CONTEXT_CHUNK_CHARS: usize = 2000;

pub const ANSWER_PROMPT: &str = "\
You are a documentation and code assistant. Your knowledge is LIMITED to the provided context below.

{context}

User question: {question}

STRICT RULES:
1. Answer ONLY using information explicitly stated in the context above
2. Include citations: Reference specific files like [auth.py] or [setup.md]
3. If information is missing, say: \"I don't see that information in the indexed sources.\"
4. Distinguish between documentation sources and code sources
5. Use direct quotes when possible: \"According to setup.md: '...'\"
6. Do not make assumptions or inferences beyond what's clearly stated
7. If you're uncertain, acknowledge it explicitly

Answer with citations:";

/// A completed turn, as recorded in session history.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub question: String,
    pub answer: String,
    pub route_label: String,
    pub sources: Vec<String>,
}

/// Assemble the answer context: a documentation section and a code section,
/// each chunk truncated and divided, in retrieval order.
#[must_use]
pub fn build_context(outcome: &RetrievalOutcome) -> String {
    let mut parts = Vec::new();

    let section = |corpus: Corpus| -> Option<String> {
        let texts: Vec<String> = outcome
            .chunks
            .iter()
            .filter(|c| c.corpus == corpus)
            .map(|c| c.content.chars().take(ANSWER_CONTEXT_CHUNK_CHARS).collect())
            .collect();
        if texts.is_empty() {
            return None;
        }
        let header = match corpus {
            Corpus::Docs => "## Documentation Context:",
            Corpus::Code => "## Code Context:",
        };
        Some(format!("{header}\n{}", texts.join("\n\n---\n\n")))
    };

    if let Some(docs) = section(Corpus::Docs) {
        parts.push(docs);
    }
    if let Some(code) = section(Corpus::Code) {
        parts.push(code);
    }

    parts.join("\n\n")
}

fn sources_of(outcome: &RetrievalOutcome, corpus: Corpus) -> Vec<String> {
    let mut sources = Vec::new();
    for chunk in outcome.chunks.iter().filter(|c| c.corpus == corpus) {
        if !sources.contains(&chunk.source) {
            sources.push(chunk.source.clone());
        }
    }
    sources
}

pub struct ChatSession {
    controller: FallbackController,
    llm: Arc<dyn LanguageModel>,
    history: Vec<TurnRecord>,
    pub docs_available: bool,
    pub code_available: bool,
}

impl ChatSession {
    #[must_use]
    pub fn new(
        controller: FallbackController,
        llm: Arc<dyn LanguageModel>,
        docs_available: bool,
        code_available: bool,
    ) -> Self {
        Self {
            controller,
            llm,
            history: Vec::new(),
            docs_available,
            code_available,
        }
    }

    pub fn history(&self) -> &[TurnRecord] {
        &self.history
    }

    /// Run one turn. Streamed fragments are handed to `on_fragment` as they
    /// arrive; `Ok(None)` means no relevant information was found.
    ///
    /// The turn is only recorded in history once the stream has fully
    /// completed; any generation error aborts the turn unrecorded.
    pub async fn answer(
        &mut self,
        question: &str,
        mut on_fragment: impl FnMut(&str),
    ) -> Result<Option<TurnRecord>> {
        let outcome = match self.controller.retrieve(question).await? {
            Some(outcome) => outcome,
            None => return Ok(None),
        };

        let context = build_context(&outcome);
        let prompt = ANSWER_PROMPT
            .replace("{context}", &context)
            .replace("{question}", question);

        let mut stream = self
            .llm
            .stream(&prompt)
            .await
            .context("error generating response")?;

        let mut answer = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment.context("error generating response")?;
            on_fragment(&fragment);
            answer.push_str(&fragment);
        }

        let mut sources = sources_of(&outcome, Corpus::Docs);
        sources.extend(sources_of(&outcome, Corpus::Code));

        let record = TurnRecord {
            question: question.to_string(),
            answer,
            route_label: outcome.route_label.clone(),
            sources,
        };
        self.history.push(record.clone());
        Ok(Some(record))
    }

    /// Interactive loop over stdin. Exits on EOF, `exit`, or `quit`.
    pub async fn run_repl(&mut self) -> Result<()> {
        println!("DevSite Assistant — smart search across documentation and code");
        println!(
            "  docs index: {}",
            if self.docs_available { "ready" } else { "missing" }
        );
        println!(
            "  code index: {}",
            if self.code_available { "ready" } else { "missing" }
        );
        println!("Model: {}", self.llm.model_name());
        println!("Type a question, or 'exit' to leave.\n");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            std::io::stdout().flush().ok();

            let line = match lines.next_line().await? {
                Some(line) => line,
                None => break,
            };
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if question == "exit" || question == "quit" {
                break;
            }

            match self
                .answer(question, |fragment| {
                    print!("{fragment}");
                    std::io::stdout().flush().ok();
                })
                .await
            {
                Ok(Some(record)) => {
                    println!();
                    if !record.sources.is_empty() {
                        let shown: Vec<&str> = record
                            .sources
                            .iter()
                            .take(3)
                            .map(String::as_str)
                            .collect();
                        println!("Sources ({}): {}", record.route_label, shown.join(", "));
                    }
                    println!();
                }
                Ok(None) => {
                    println!("No relevant information found in any sources.\n");
                }
                Err(e) => {
                    eprintln!("\nError generating response: {e:#}");
                    eprintln!("Make sure the model service is running: ollama serve\n");
                }
            }
        }

        Ok(())
    }
}
