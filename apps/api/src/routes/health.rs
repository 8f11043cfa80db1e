use std::time::Instant;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::llm_client::ChatRequest;
use crate::state::AppState;

/// GET /
/// Service banner and endpoint map.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Health Diary & Clinical Scribe API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "health_diary": "/api/diary",
            "clinical_notes": "/api/clinical/transcribe",
            "text_to_soap": "/api/clinical/text-to-soap",
            "live_dictation": "/ws/clinical/live",
            "doctors": "/api/doctors"
        }
    }))
}

/// GET /health
/// Reports which upstream services are configured, plus non-secret config flags.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "speech": state.speech.is_some(),
            "openai": state.llm.is_some(),
            "text_analytics": state.health_nlp.is_some()
        },
        "debug": {
            "speech_key_set": config.speech.is_some(),
            "speech_region": config.speech.as_ref().map(|s| s.region.as_str()),
            "openai_endpoint_set": config.openai.is_some(),
            "openai_endpoint": config.openai.as_ref().map(|o| o.endpoint.as_str()),
            "openai_deployment": state.llm.as_ref().map(|llm| llm.model()),
            "text_analytics_endpoint_set": config.text_analytics.is_some(),
            "live_refresh_interval_secs": config.live_refresh_interval.as_secs()
        }
    }))
}

/// GET /api/debug/openai
/// Sends a one-word prompt through the configured model and reports latency.
pub async fn openai_probe_handler(State(state): State<AppState>) -> Json<Value> {
    let Some(llm) = state.llm() else {
        return Json(json!({
            "configured": false,
            "ok": false,
            "error": "Azure OpenAI is not configured"
        }));
    };

    let request = ChatRequest {
        system: "You are a connectivity check. Reply with the single word: pong",
        user: "ping",
        temperature: 0.0,
        max_tokens: 5,
    };

    let started = Instant::now();
    let result = llm.complete(request).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(reply) => Json(json!({
            "configured": true,
            "ok": true,
            "model": llm.model(),
            "latency_ms": latency_ms,
            "reply": reply
        })),
        Err(e) => {
            tracing::warn!("OpenAI probe failed: {e}");
            Json(json!({
                "configured": true,
                "ok": false,
                "model": llm.model(),
                "latency_ms": latency_ms,
                "error": e.to_string()
            }))
        }
    }
}
