use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::errors::ProviderResult;
use crate::providers::base::{CompletionEvent, CompletionRequest, CompletionStream, Provider};

/// A mock provider that plays back pre-configured outcomes and records what it was sent
pub struct MockProvider {
    outcomes: Arc<Mutex<Vec<ProviderResult<Vec<CompletionEvent>>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of outcomes, one per call
    pub fn new(outcomes: Vec<ProviderResult<Vec<CompletionEvent>>>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every request received so far, in call order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn stream(
        &self,
        request: &CompletionRequest,
        _cancel: CancellationToken,
    ) -> ProviderResult<CompletionStream> {
        self.requests.lock().unwrap().push(request.clone());

        let mut outcomes = self.outcomes.lock().unwrap();
        let events = if outcomes.is_empty() {
            // Return an empty completion if no more pre-configured outcomes
            vec![CompletionEvent::FinalContent(String::new())]
        } else {
            outcomes.remove(0)?
        };
        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
    }
}
