mod clinical;
mod config;
mod diary;
mod doctors;
mod errors;
mod integrations;
mod llm_client;
mod models;
mod routes;
mod speech;
mod state;
#[cfg(test)]
mod test_support;
mod vocabulary;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::diary::store::DiaryStore;
use crate::integrations::{
    AzureHealthClient, ClinicalTablesClient, ConditionLookup, HealthEntityExtractor, NppesClient,
    ProviderRegistry,
};
use crate::llm_client::{ChatCompletion, LlmClient};
use crate::routes::build_router;
use crate::speech::{AzureSpeechClient, SpeechToText};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails only on malformed numeric env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Scribe API v{}", env!("CARGO_PKG_VERSION"));
    config.warn_missing_services();

    // One HTTP client shared by every upstream integration
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let llm = config.openai.as_ref().map(|openai| {
        let client = LlmClient::new(http.clone(), openai);
        info!("LLM client initialized (deployment: {})", client.model());
        Arc::new(client) as Arc<dyn ChatCompletion>
    });

    let speech = config.speech.as_ref().map(|speech| {
        info!("Speech client initialized (region: {})", speech.region);
        Arc::new(AzureSpeechClient::new(http.clone(), speech)) as Arc<dyn SpeechToText>
    });

    let health_nlp = config.text_analytics.as_ref().map(|ta| {
        info!("Healthcare entity extraction enabled");
        Arc::new(AzureHealthClient::new(http.clone(), ta)) as Arc<dyn HealthEntityExtractor>
    });

    let conditions: Arc<dyn ConditionLookup> =
        Arc::new(ClinicalTablesClient::new(http.clone(), &config.conditions_api_url));
    let providers: Arc<dyn ProviderRegistry> =
        Arc::new(NppesClient::new(http.clone(), &config.npi_registry_url));

    // Build app state
    let state = AppState {
        llm,
        speech,
        health_nlp,
        conditions,
        providers,
        diary: DiaryStore::default(),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
