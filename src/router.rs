//! Query routing and retrieval quality judgment.
//!
//! A single classification call decides which corpus a question should hit
//! (DOCS, CODE, or BOTH); a second judgment call decides whether retrieved
//! context is sufficient. Both are deterministic given a fixed model
//! response and never fail a turn: malformed output resolves to a
//! conservative default.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::llm::LanguageModel;

/// Contexts shorter than this are judged insufficient without a model call.
pub const MIN_CONTEXT_CHARS: usize = 100;

/// Characters of context shown to the quality judgment prompt.
const QUALITY_CONTEXT_CHARS: usize = 1000;

pub const ROUTER_PROMPT: &str = "\
You are a query router. Analyze the user's question and determine which knowledge sources to search.

Categories:
- DOCS: Setup, configuration, guides, architecture, principles, how-to, installation
- CODE: Implementation, functions, classes, methods, bugs, code patterns, API details
- BOTH: Needs both documentation AND code examples

Respond with ONLY one: DOCS, CODE, or BOTH

Examples:
\"How do I set up the project?\" -> DOCS
\"What does the authenticate() function do?\" -> CODE
\"How is authentication implemented?\" -> BOTH
\"What are the design principles?\" -> DOCS
\"Show me the payment processing logic\" -> CODE
\"Explain error handling with examples\" -> BOTH

User question: {question}

Response (one word only):";

pub const QUALITY_CHECK_PROMPT: &str = "\
Check if the retrieved context adequately answers the user's question.

User question: {question}

Retrieved context (first 1000 chars):
{context}

Does this context contain enough information to answer the question?

Respond with only: SUFFICIENT or INSUFFICIENT

- SUFFICIENT: Context has relevant information to answer
- INSUFFICIENT: Context is missing or irrelevant

Response (one word only):";

/// Which corpus a query should be answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Docs,
    Code,
    Both,
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Docs => "DOCS",
            Self::Code => "CODE",
            Self::Both => "BOTH",
        };
        write!(f, "{label}")
    }
}

/// How unrecognized router responses are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouterPolicy {
    /// Validate against the three labels; anything else maps to BOTH
    /// (prefer over-retrieval to under-retrieval).
    BothDefault,
    /// Substring matching: CODE without BOTH wins, BOTH wins, else DOCS.
    #[default]
    DocsDefault,
}

impl RouterPolicy {
    #[must_use]
    pub fn default_route(self) -> RouteDecision {
        match self {
            Self::BothDefault => RouteDecision::Both,
            Self::DocsDefault => RouteDecision::Docs,
        }
    }
}

/// Map a raw model response to a route. Pure and total: trims, upper-cases,
/// and resolves anything unrecognized per the policy.
#[must_use]
pub fn parse_route(response: &str, policy: RouterPolicy) -> RouteDecision {
    let normalized = response.trim().to_uppercase();

    match policy {
        RouterPolicy::BothDefault => match normalized.as_str() {
            "DOCS" => RouteDecision::Docs,
            "CODE" => RouteDecision::Code,
            "BOTH" => RouteDecision::Both,
            _ => RouteDecision::Both,
        },
        RouterPolicy::DocsDefault => {
            if normalized.contains("CODE") && !normalized.contains("BOTH") {
                RouteDecision::Code
            } else if normalized.contains("BOTH") {
                RouteDecision::Both
            } else {
                RouteDecision::Docs
            }
        }
    }
}

/// Whether retrieved context is judged good enough to answer from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Sufficient,
    Insufficient,
}

pub struct Router {
    llm: Arc<dyn LanguageModel>,
    policy: RouterPolicy,
}

impl Router {
    #[must_use]
    pub fn new(llm: Arc<dyn LanguageModel>, policy: RouterPolicy) -> Self {
        Self { llm, policy }
    }

    #[must_use]
    pub fn policy(&self) -> RouterPolicy {
        self.policy
    }

    /// Route a question to its corpus. A transport failure resolves to the
    /// policy default rather than failing the turn.
    pub async fn route(&self, question: &str) -> RouteDecision {
        let prompt = ROUTER_PROMPT.replace("{question}", question);
        match self.llm.invoke(&prompt).await {
            Ok(response) => parse_route(&response, self.policy),
            Err(e) => {
                warn!("Router call failed, using policy default: {e}");
                self.policy.default_route()
            }
        }
    }

    /// Judge whether the retrieved context can answer the question.
    ///
    /// Near-empty context short-circuits to [`Quality::Insufficient`]
    /// without a model call. A malformed or failed judgment also resolves
    /// to insufficient.
    pub async fn check_quality(&self, question: &str, context: &str) -> Quality {
        if context.trim().chars().count() < MIN_CONTEXT_CHARS {
            return Quality::Insufficient;
        }

        let sample: String = context.chars().take(QUALITY_CONTEXT_CHARS).collect();
        let prompt = QUALITY_CHECK_PROMPT
            .replace("{question}", question)
            .replace("{context}", &sample);

        match self.llm.invoke(&prompt).await {
            Ok(response) => match response.trim().to_uppercase().as_str() {
                "SUFFICIENT" => Quality::Sufficient,
                "INSUFFICIENT" => Quality::Insufficient,
                _ => Quality::Insufficient,
            },
            Err(e) => {
                warn!("Quality check failed, treating as insufficient: {e}");
                Quality::Insufficient
            }
        }
    }
}
