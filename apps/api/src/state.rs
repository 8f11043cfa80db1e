use std::sync::Arc;

use crate::config::Config;
use crate::diary::store::DiaryStore;
use crate::integrations::{ConditionLookup, HealthEntityExtractor, ProviderRegistry};
use crate::llm_client::ChatCompletion;
use crate::speech::SpeechToText;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Absent when Azure OpenAI credentials are missing; pipelines then use their fallbacks.
    pub llm: Option<Arc<dyn ChatCompletion>>,
    pub speech: Option<Arc<dyn SpeechToText>>,
    pub health_nlp: Option<Arc<dyn HealthEntityExtractor>>,
    /// Public APIs, no credentials required.
    pub conditions: Arc<dyn ConditionLookup>,
    pub providers: Arc<dyn ProviderRegistry>,
    pub diary: DiaryStore,
    pub config: Config,
}

impl AppState {
    pub fn llm(&self) -> Option<&dyn ChatCompletion> {
        self.llm.as_deref()
    }
}
