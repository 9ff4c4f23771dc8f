/// Scripted language model for tests.
///
/// Responses are consumed front to back; once the script is exhausted the
/// last response repeats. The invocation counter lets controller tests
/// assert how many single-shot calls a turn performed.
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream;

use super::{LanguageModel, LlmError, TokenStream};

pub struct MockLlm {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    invocations: AtomicUsize,
}

impl MockLlm {
    #[must_use]
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            last: Mutex::new(String::new()),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Number of `invoke` calls made so far.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> String {
        let mut queue = self.responses.lock().unwrap();
        match queue.pop_front() {
            Some(r) => {
                *self.last.lock().unwrap() = r.clone();
                r
            }
            None => self.last.lock().unwrap().clone(),
        }
    }
}

#[async_trait]
impl LanguageModel for MockLlm {
    async fn invoke(&self, _prompt: &str) -> Result<String, LlmError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_response())
    }

    async fn stream(&self, _prompt: &str) -> Result<TokenStream, LlmError> {
        let response = self.next_response();
        let fragments: Vec<Result<String, LlmError>> = response
            .split_inclusive(' ')
            .map(|w| Ok(w.to_string()))
            .collect();
        Ok(Box::pin(stream::iter(fragments)))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let llm = MockLlm::new(&["DOCS", "INSUFFICIENT"]);
        assert_eq!(llm.invoke("a").await.unwrap(), "DOCS");
        assert_eq!(llm.invoke("b").await.unwrap(), "INSUFFICIENT");
        assert_eq!(llm.invocations(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_script_repeats_last() {
        let llm = MockLlm::new(&["BOTH"]);
        assert_eq!(llm.invoke("a").await.unwrap(), "BOTH");
        assert_eq!(llm.invoke("b").await.unwrap(), "BOTH");
    }

    #[tokio::test]
    async fn test_stream_reassembles_response() {
        let llm = MockLlm::new(&["hello streaming world"]);
        let mut stream = llm.stream("q").await.unwrap();
        let mut full = String::new();
        while let Some(fragment) = stream.next().await {
            full.push_str(&fragment.unwrap());
        }
        assert_eq!(full, "hello streaming world");
    }
}
