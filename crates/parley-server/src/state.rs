use parley::orchestrator::Orchestrator;
use parley::providers::base::Provider;
use std::sync::Arc;

/// Shared application state, immutable after startup
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            orchestrator: Orchestrator::new(provider),
        }
    }
}
