//! Medical-conditions lookup against the NLM Clinical Tables search API.
//!
//! The API answers with a positional array:
//! `[total, [codes], extra, [[primary_name, icd10cm_codes], ...]]`.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{api_error, IntegrationError};

/// A single lookup hit: display name plus zero or more ICD-10-CM codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionHit {
    pub name: String,
    pub icd10_codes: Vec<String>,
}

#[async_trait]
pub trait ConditionLookup: Send + Sync {
    async fn search(&self, term: &str, max_results: usize)
        -> Result<Vec<ConditionHit>, IntegrationError>;
}

#[derive(Clone)]
pub struct ClinicalTablesClient {
    client: Client,
    url: String,
}

impl ClinicalTablesClient {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl ConditionLookup for ClinicalTablesClient {
    async fn search(
        &self,
        term: &str,
        max_results: usize,
    ) -> Result<Vec<ConditionHit>, IntegrationError> {
        let max_list = max_results.to_string();
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("terms", term),
                ("maxList", max_list.as_str()),
                ("df", "primary_name,icd10cm_codes"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: Value = response.json().await?;
        parse_search_response(&body)
    }
}

fn parse_search_response(body: &Value) -> Result<Vec<ConditionHit>, IntegrationError> {
    let rows = body
        .get(3)
        .and_then(Value::as_array)
        .ok_or_else(|| IntegrationError::Parse("conditions response has no display rows".to_string()))?;

    Ok(rows
        .iter()
        .filter_map(|row| {
            let name = row.get(0)?.as_str()?.trim();
            if name.is_empty() {
                return None;
            }
            let icd10_codes = row
                .get(1)
                .and_then(Value::as_str)
                .map(|codes| {
                    codes
                        .split(',')
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            Some(ConditionHit {
                name: name.to_string(),
                icd10_codes,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rows_with_codes() {
        let body = json!([
            2,
            ["2958", "4562"],
            null,
            [["Migraine", "G43.909,G43.919"], ["Tension headache", "G44.209"]]
        ]);
        let hits = parse_search_response(&body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "Migraine");
        assert_eq!(hits[0].icd10_codes, vec!["G43.909", "G43.919"]);
        assert_eq!(hits[1].icd10_codes, vec!["G44.209"]);
    }

    #[test]
    fn test_parse_row_without_codes() {
        let body = json!([1, ["1"], null, [["Fatigue", ""]]]);
        let hits = parse_search_response(&body).unwrap();
        assert!(hits[0].icd10_codes.is_empty());
    }

    #[test]
    fn test_parse_empty_result() {
        let body = json!([0, [], null, []]);
        assert!(parse_search_response(&body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_unexpected_shape() {
        let body = json!({"error": "bad request"});
        assert!(matches!(
            parse_search_response(&body),
            Err(IntegrationError::Parse(_))
        ));
    }
}
