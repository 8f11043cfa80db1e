//! In-memory fakes for every upstream trait, shared by the unit and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::diary::store::DiaryStore;
use crate::integrations::terminology::ConditionHit;
use crate::integrations::{
    ConditionLookup, HealthEntityExtractor, IntegrationError, ProviderQuery, ProviderRegistry,
};
use crate::llm_client::{ChatCompletion, ChatRequest, LlmError};
use crate::models::clinical::{Doctor, HealthAnalysis};
use crate::speech::audio::AudioClip;
use crate::speech::{SpeechError, SpeechToText};
use crate::state::AppState;

/// Replies with the first route whose key appears in the system or user message.
/// Unrouted requests fail, which drives callers onto their fallback path.
#[derive(Default)]
pub struct FakeChat {
    routes: Vec<(String, String)>,
    requests: Mutex<Vec<(String, String)>>,
}

impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, key: &str, reply: &str) -> Self {
        self.routes.push((key.to_string(), reply.to_string()));
        self
    }

    /// (system, user) pairs seen so far.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatCompletion for FakeChat {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String, LlmError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.system.to_string(), request.user.to_string()));
        self.routes
            .iter()
            .find(|(key, _)| request.system.contains(key) || request.user.contains(key))
            .map(|(_, reply)| reply.clone())
            .ok_or(LlmError::Api {
                status: 500,
                message: "no scripted reply".to_string(),
            })
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

/// Recognizes every clip as the same text, or as silence when built with `silent()`.
pub struct FakeSpeech {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl FakeSpeech {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn silent() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechToText for FakeSpeech {
    async fn recognize(&self, _clip: &AudioClip, _language: &str) -> Result<String, SpeechError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .ok_or_else(|| SpeechError::NoMatch("NoMatch".to_string()))
    }
}

pub struct FakeEntities(pub Option<HealthAnalysis>);

#[async_trait]
impl HealthEntityExtractor for FakeEntities {
    async fn extract(&self, _text: &str) -> Result<HealthAnalysis, IntegrationError> {
        self.0.clone().ok_or(IntegrationError::Timeout(1))
    }
}

#[derive(Default)]
pub struct FakeConditions {
    hits: HashMap<String, Vec<ConditionHit>>,
    terms: Mutex<Vec<String>>,
}

impl FakeConditions {
    pub fn with(mut self, term: &str, names: &[&str]) -> Self {
        self.hits.insert(
            term.to_string(),
            names
                .iter()
                .map(|name| ConditionHit {
                    name: name.to_string(),
                    icd10_codes: vec![],
                })
                .collect(),
        );
        self
    }

    pub fn terms(&self) -> Vec<String> {
        self.terms.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConditionLookup for FakeConditions {
    async fn search(
        &self,
        term: &str,
        max_results: usize,
    ) -> Result<Vec<ConditionHit>, IntegrationError> {
        self.terms.lock().unwrap().push(term.to_string());
        let mut hits = self.hits.get(term).cloned().unwrap_or_default();
        hits.truncate(max_results);
        Ok(hits)
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    pub doctors: Vec<Doctor>,
    pub fail: bool,
    queries: Mutex<Vec<ProviderQuery>>,
}

impl FakeRegistry {
    pub fn with_doctors(doctors: Vec<Doctor>) -> Self {
        Self {
            doctors,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<ProviderQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderRegistry for FakeRegistry {
    async fn search(&self, query: &ProviderQuery) -> Result<Vec<Doctor>, IntegrationError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail {
            return Err(IntegrationError::Api {
                status: 503,
                message: "registry down".to_string(),
            });
        }
        Ok(self.doctors.iter().take(query.limit as usize).cloned().collect())
    }
}

pub fn doctor(npi: &str, name: &str) -> Doctor {
    Doctor {
        npi: npi.to_string(),
        name: name.to_string(),
        credential: Some("MD".to_string()),
        specialty: Some("Neurology".to_string()),
        address: None,
        city: Some("Boston".to_string()),
        state: Some("MA".to_string()),
        postal_code: None,
        phone: None,
    }
}

pub fn test_config() -> Config {
    Config {
        speech: None,
        openai: None,
        text_analytics: None,
        conditions_api_url: crate::config::DEFAULT_CONDITIONS_API_URL.to_string(),
        npi_registry_url: crate::config::DEFAULT_NPI_REGISTRY_URL.to_string(),
        live_refresh_interval: Duration::from_secs(10),
        http_timeout: Duration::from_secs(5),
        max_body_bytes: 10 * 1024 * 1024,
        port: 0,
        rust_log: "debug".to_string(),
    }
}

/// State with no AI services configured: every pipeline runs its fallback.
pub fn offline_state() -> AppState {
    AppState {
        llm: None,
        speech: None,
        health_nlp: None,
        conditions: Arc::new(FakeConditions::default()),
        providers: Arc::new(FakeRegistry::default()),
        diary: DiaryStore::default(),
        config: test_config(),
    }
}
