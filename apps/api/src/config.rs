use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

pub const DEFAULT_CONDITIONS_API_URL: &str =
    "https://clinicaltables.nlm.nih.gov/api/conditions/v3/search";
pub const DEFAULT_NPI_REGISTRY_URL: &str = "https://npiregistry.cms.hhs.gov/api/";

/// Application configuration loaded from environment variables.
/// Azure credentials are optional: a missing service is logged and its pipelines fall back.
#[derive(Debug, Clone)]
pub struct Config {
    pub speech: Option<SpeechConfig>,
    pub openai: Option<OpenAiConfig>,
    pub text_analytics: Option<TextAnalyticsConfig>,
    pub conditions_api_url: String,
    pub npi_registry_url: String,
    pub live_refresh_interval: Duration,
    pub http_timeout: Duration,
    pub max_body_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub key: String,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub deployment: String,
}

#[derive(Debug, Clone)]
pub struct TextAnalyticsConfig {
    pub endpoint: String,
    pub key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let speech = optional_env("AZURE_SPEECH_KEY").map(|key| SpeechConfig {
            key,
            region: env_or("AZURE_SPEECH_REGION", "eastus"),
        });

        let openai = match (
            optional_env("AZURE_OPENAI_ENDPOINT"),
            optional_env("AZURE_OPENAI_API_KEY"),
        ) {
            (Some(endpoint), Some(api_key)) => Some(OpenAiConfig {
                endpoint,
                api_key,
                api_version: env_or("AZURE_OPENAI_API_VERSION", "2024-02-15-preview"),
                deployment: env_or("AZURE_OPENAI_DEPLOYMENT", "gpt-4"),
            }),
            _ => None,
        };

        let text_analytics = match (
            optional_env("AZURE_TEXT_ANALYTICS_ENDPOINT"),
            optional_env("AZURE_TEXT_ANALYTICS_KEY"),
        ) {
            (Some(endpoint), Some(key)) => Some(TextAnalyticsConfig { endpoint, key }),
            _ => None,
        };

        Ok(Config {
            speech,
            openai,
            text_analytics,
            conditions_api_url: env_or("CONDITIONS_API_URL", DEFAULT_CONDITIONS_API_URL),
            npi_registry_url: env_or("NPI_REGISTRY_URL", DEFAULT_NPI_REGISTRY_URL),
            live_refresh_interval: Duration::from_secs(parse_env("LIVE_REFRESH_INTERVAL_SECS", 10)?),
            http_timeout: Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", 60)?),
            max_body_bytes: parse_env("MAX_BODY_BYTES", 10 * 1024 * 1024)?,
            port: parse_env("PORT", 8000)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

impl Config {
    /// Logs one warning per Azure service whose credentials are missing.
    /// Called after the subscriber is installed so the warnings are not lost.
    pub fn warn_missing_services(&self) {
        if self.speech.is_none() {
            warn!("AZURE_SPEECH_KEY not set; audio transcription is unavailable");
        }
        if self.openai.is_none() {
            warn!(
                "AZURE_OPENAI_ENDPOINT / AZURE_OPENAI_API_KEY not set; AI pipelines use rule-based fallbacks"
            );
        }
        if self.text_analytics.is_none() {
            warn!("AZURE_TEXT_ANALYTICS_ENDPOINT / AZURE_TEXT_ANALYTICS_KEY not set; entity extraction is skipped");
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u16 = parse_env("SCRIBE_TEST_SURELY_UNSET_VAR", 8000).unwrap();
        assert_eq!(value, 8000);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("SCRIBE_TEST_BAD_PORT", "not-a-port");
        let result: Result<u16> = parse_env("SCRIBE_TEST_BAD_PORT", 8000);
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_env_is_treated_as_missing() {
        std::env::set_var("SCRIBE_TEST_BLANK", "   ");
        assert!(optional_env("SCRIBE_TEST_BLANK").is_none());
        assert_eq!(env_or("SCRIBE_TEST_BLANK", "eastus"), "eastus");
    }
}
