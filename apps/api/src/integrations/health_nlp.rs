//! Healthcare entity extraction via the Azure Language "Healthcare" analyze-text job API.
//!
//! The job API is asynchronous: submit, then poll the `operation-location` URL until the
//! job reports `succeeded`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{api_error, IntegrationError};
use crate::config::TextAnalyticsConfig;
use crate::models::clinical::{HealthAnalysis, HealthEntity, HealthRelation, RelationRole};

const API_VERSION: &str = "2023-04-01";
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const MAX_POLLS: u32 = 40;

#[async_trait]
pub trait HealthEntityExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<HealthAnalysis, IntegrationError>;
}

#[derive(Clone)]
pub struct AzureHealthClient {
    client: Client,
    endpoint: String,
    key: String,
}

impl AzureHealthClient {
    pub fn new(client: Client, config: &TextAnalyticsConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            key: config.key.clone(),
        }
    }

    async fn submit(&self, text: &str) -> Result<String, IntegrationError> {
        let body = json!({
            "displayName": "clinical-note-entities",
            "analysisInput": {
                "documents": [{"id": "1", "language": "en", "text": text}]
            },
            "tasks": [{"kind": "Healthcare", "taskName": "healthcare"}]
        });

        let response = self
            .client
            .post(format!("{}/language/analyze-text/jobs", self.endpoint))
            .query(&[("api-version", API_VERSION)])
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        response
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| IntegrationError::Parse("missing operation-location header".to_string()))
    }
}

#[async_trait]
impl HealthEntityExtractor for AzureHealthClient {
    async fn extract(&self, text: &str) -> Result<HealthAnalysis, IntegrationError> {
        let job_url = self.submit(text).await?;

        for attempt in 0..MAX_POLLS {
            if attempt > 0 {
                tokio::time::sleep(POLL_INTERVAL).await;
            }

            let response = self
                .client
                .get(&job_url)
                .header("Ocp-Apim-Subscription-Key", &self.key)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }

            let job: JobState = response.json().await?;
            match job.status.as_str() {
                "succeeded" => {
                    debug!("Healthcare job finished after {} polls", attempt + 1);
                    return Ok(analysis_from_job(job));
                }
                "failed" | "cancelled" | "partiallyFailed" => {
                    return Err(IntegrationError::Api {
                        status: 200,
                        message: format!("healthcare job ended with status '{}'", job.status),
                    });
                }
                _ => continue,
            }
        }

        Err(IntegrationError::Timeout(MAX_POLLS))
    }
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct JobState {
    status: String,
    #[serde(default)]
    tasks: Option<JobTasks>,
}

#[derive(Debug, Deserialize)]
struct JobTasks {
    #[serde(default)]
    items: Vec<JobTaskItem>,
}

#[derive(Debug, Deserialize)]
struct JobTaskItem {
    results: Option<JobResults>,
}

#[derive(Debug, Deserialize)]
struct JobResults {
    #[serde(default)]
    documents: Vec<DocumentResult>,
}

#[derive(Debug, Deserialize)]
struct DocumentResult {
    #[serde(default)]
    entities: Vec<WireEntity>,
    #[serde(default)]
    relations: Vec<WireRelation>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntity {
    text: String,
    category: String,
    confidence_score: f64,
    offset: usize,
    length: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRelation {
    relation_type: String,
    #[serde(default)]
    entities: Vec<WireRelationEntity>,
}

#[derive(Debug, Deserialize)]
struct WireRelationEntity {
    #[serde(rename = "ref")]
    reference: String,
    role: String,
}

/// Flattens the first document of the first task. Relation roles reference entities by a
/// JSON pointer (`#/results/documents/0/entities/3`); unresolvable refs are kept verbatim.
fn analysis_from_job(job: JobState) -> HealthAnalysis {
    let Some(document) = job
        .tasks
        .and_then(|t| t.items.into_iter().next())
        .and_then(|item| item.results)
        .and_then(|r| r.documents.into_iter().next())
    else {
        return HealthAnalysis::default();
    };

    let entities: Vec<HealthEntity> = document
        .entities
        .into_iter()
        .map(|e| HealthEntity {
            text: e.text,
            category: e.category,
            confidence: e.confidence_score,
            offset: e.offset,
            length: e.length,
        })
        .collect();

    let relations = document
        .relations
        .into_iter()
        .map(|r| HealthRelation {
            relation_type: r.relation_type,
            roles: r
                .entities
                .into_iter()
                .map(|role| RelationRole {
                    entity: resolve_entity_ref(&role.reference, &entities)
                        .unwrap_or(role.reference),
                    name: role.role,
                })
                .collect(),
        })
        .collect();

    HealthAnalysis {
        entities,
        relations,
    }
}

fn resolve_entity_ref(reference: &str, entities: &[HealthEntity]) -> Option<String> {
    let index: usize = reference.rsplit('/').next()?.parse().ok()?;
    entities.get(index).map(|e| e.text.clone())
}
