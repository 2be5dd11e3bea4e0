//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent (fresh context)
///
/// Every orchestrator step renders its own prompt and sends it alone; no
/// conversation state is carried between calls.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model identifier, used for logging and cost reporting
    fn model(&self) -> &str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing::debug;

    /// Mock LLM client for unit tests
    ///
    /// Replays scripted responses in order. With `cycling()` the script
    /// wraps around instead of running dry.
    pub struct MockLlmClient {
        responses: Vec<CompletionResponse>,
        call_count: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
        delay: Option<Duration>,
        cycle: bool,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<CompletionResponse>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self {
                responses,
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                delay: None,
                cycle: false,
            }
        }

        /// Script plain text replies
        pub fn from_texts(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| CompletionResponse::text(*t)).collect())
        }

        /// Sleep before every reply
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Repeat the script forever
        pub fn cycling(mut self) -> Self {
            self.cycle = true;
            self
        }

        pub fn call_count(&self) -> usize {
            debug!("MockLlmClient::call_count: called");
            self.call_count.load(Ordering::SeqCst)
        }

        /// Requests seen so far, in call order
        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            debug!("MockLlmClient::complete: called");
            if let Ok(mut seen) = self.requests.lock() {
                seen.push(request);
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let mut idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.cycle && !self.responses.is_empty() {
                idx %= self.responses.len();
            }
            debug!(%idx, "MockLlmClient::complete: fetching response");
            self.responses.get(idx).cloned().ok_or_else(|| {
                debug!("MockLlmClient::complete: no more mock responses");
                LlmError::InvalidResponse("No more mock responses".to_string())
            })
        }

        fn model(&self) -> &str {
            "mock"
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_responses() {
            let client = MockLlmClient::from_texts(&["Response 1", "Response 2"]);
            let req = CompletionRequest::single("Test", "hi", 1000);

            let resp1 = client.complete(req.clone()).await.unwrap();
            assert_eq!(resp1.content, Some("Response 1".to_string()));

            let resp2 = client.complete(req.clone()).await.unwrap();
            assert_eq!(resp2.content, Some("Response 2".to_string()));

            assert_eq!(client.call_count(), 2);
            assert_eq!(client.requests().len(), 2);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            let result = client.complete(CompletionRequest::single("Test", "hi", 1000)).await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_mock_client_cycles() {
            let client = MockLlmClient::from_texts(&["a", "b"]).cycling();
            let req = CompletionRequest::single("Test", "hi", 10);
            for expected in ["a", "b", "a", "b", "a"] {
                let resp = client.complete(req.clone()).await.unwrap();
                assert_eq!(resp.text_or_empty(), expected);
            }
        }
    }
}
