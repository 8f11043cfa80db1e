//! Provider lookup against the NPPES NPI registry (v2.1 JSON API).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{api_error, IntegrationError};
use crate::models::clinical::Doctor;

/// Registry search filters. Empty fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderQuery {
    pub specialty: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub limit: u32,
}

#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    async fn search(&self, query: &ProviderQuery) -> Result<Vec<Doctor>, IntegrationError>;
}

#[derive(Clone)]
pub struct NppesClient {
    client: Client,
    url: String,
}

impl NppesClient {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl ProviderRegistry for NppesClient {
    async fn search(&self, query: &ProviderQuery) -> Result<Vec<Doctor>, IntegrationError> {
        let mut params: Vec<(&str, String)> = vec![
            ("version", "2.1".to_string()),
            ("enumeration_type", "NPI-1".to_string()),
            ("taxonomy_description", query.specialty.clone()),
            ("limit", query.limit.to_string()),
        ];
        for (key, value) in [
            ("city", &query.city),
            ("state", &query.state),
            ("postal_code", &query.postal_code),
        ] {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                params.push((key, value.to_string()));
            }
        }

        let response = self.client.get(&self.url).query(&params).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: RegistryResponse = response.json().await?;
        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            let message = errors
                .into_iter()
                .filter_map(|e| e.description)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(IntegrationError::Api {
                status: 200,
                message,
            });
        }

        Ok(body.results.into_iter().filter_map(doctor_from_result).collect())
    }
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RegistryResponse {
    #[serde(default)]
    results: Vec<RegistryResult>,
    #[serde(rename = "Errors")]
    errors: Option<Vec<RegistryError>>,
}

#[derive(Debug, Deserialize)]
struct RegistryError {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryResult {
    number: Value,
    #[serde(default)]
    basic: Basic,
    #[serde(default)]
    addresses: Vec<Address>,
    #[serde(default)]
    taxonomies: Vec<Taxonomy>,
}

#[derive(Debug, Default, Deserialize)]
struct Basic {
    first_name: Option<String>,
    last_name: Option<String>,
    credential: Option<String>,
    organization_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Address {
    address_purpose: Option<String>,
    address_1: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    telephone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Taxonomy {
    desc: Option<String>,
    #[serde(default)]
    primary: bool,
}

fn doctor_from_result(result: RegistryResult) -> Option<Doctor> {
    let npi = match &result.number {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let basic = result.basic;
    let name = match (&basic.first_name, &basic.last_name, &basic.organization_name) {
        (Some(first), Some(last), _) => format!("{} {}", title_case(first), title_case(last)),
        (_, _, Some(org)) => org.clone(),
        (None, Some(last), None) => title_case(last),
        _ => return None,
    };

    // Practice location first; mailing address otherwise.
    let address = result
        .addresses
        .iter()
        .find(|a| a.address_purpose.as_deref() == Some("LOCATION"))
        .or_else(|| result.addresses.first());

    let specialty = result
        .taxonomies
        .iter()
        .find(|t| t.primary)
        .or_else(|| result.taxonomies.first())
        .and_then(|t| t.desc.clone());

    Some(Doctor {
        npi,
        name,
        credential: basic.credential.filter(|c| !c.trim().is_empty()),
        specialty,
        address: address.and_then(|a| a.address_1.clone()),
        city: address.and_then(|a| a.city.clone()),
        state: address.and_then(|a| a.state.clone()),
        postal_code: address.and_then(|a| a.postal_code.clone()),
        phone: address.and_then(|a| a.telephone_number.clone()),
    })
}

fn title_case(word: &str) -> String {
    word.split_whitespace()
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY_BODY: &str = r#"{
        "result_count": 2,
        "results": [
            {
                "number": 1234567890,
                "basic": {"first_name": "JANE", "last_name": "DOE", "credential": "MD"},
                "addresses": [
                    {"address_purpose": "MAILING", "address_1": "PO BOX 1", "city": "BOSTON", "state": "MA", "postal_code": "02101"},
                    {"address_purpose": "LOCATION", "address_1": "1 MAIN ST", "city": "BOSTON", "state": "MA", "postal_code": "02115", "telephone_number": "617-555-0100"}
                ],
                "taxonomies": [
                    {"desc": "Internal Medicine", "primary": false},
                    {"desc": "Neurology", "primary": true}
                ]
            },
            {
                "number": "9876543210",
                "basic": {"organization_name": "City Clinic"},
                "addresses": [],
                "taxonomies": []
            }
        ]
    }"#;

    #[test]
    fn test_results_map_to_doctors() {
        let body: RegistryResponse = serde_json::from_str(REGISTRY_BODY).unwrap();
        let doctors: Vec<Doctor> = body.results.into_iter().filter_map(doctor_from_result).collect();

        assert_eq!(doctors.len(), 2);
        assert_eq!(doctors[0].npi, "1234567890");
        assert_eq!(doctors[0].name, "Jane Doe");
        assert_eq!(doctors[0].specialty.as_deref(), Some("Neurology"));
        assert_eq!(doctors[0].address.as_deref(), Some("1 MAIN ST"));
        assert_eq!(doctors[0].phone.as_deref(), Some("617-555-0100"));

        assert_eq!(doctors[1].npi, "9876543210");
        assert_eq!(doctors[1].name, "City Clinic");
        assert!(doctors[1].address.is_none());
    }

    #[test]
    fn test_error_body_deserializes() {
        let body: RegistryResponse = serde_json::from_str(
            r#"{"Errors": [{"description": "No valid search criteria", "field": "generic", "number": "04"}]}"#,
        )
        .unwrap();
        assert!(body.results.is_empty());
        assert_eq!(body.errors.unwrap().len(), 1);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("MARY ANNE"), "Mary Anne");
        assert_eq!(title_case("o'brien"), "O'brien");
    }
}
