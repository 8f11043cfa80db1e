//! Clients for the non-LLM upstream services. Each sits behind a trait so pipelines can be
//! exercised with fakes and so a missing credential simply means "no client".

use thiserror::Error;

pub mod health_nlp;
pub mod provider_registry;
pub mod terminology;

pub use health_nlp::{AzureHealthClient, HealthEntityExtractor};
pub use provider_registry::{NppesClient, ProviderQuery, ProviderRegistry};
pub use terminology::{ClinicalTablesClient, ConditionLookup};

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response shape: {0}")]
    Parse(String),

    #[error("Job did not finish after {0} polls")]
    Timeout(u32),
}

/// Reads a non-success response into `IntegrationError::Api`.
pub(crate) async fn api_error(response: reqwest::Response) -> IntegrationError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    IntegrationError::Api { status, message }
}
