pub mod form;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::clinical::{handlers as clinical, live};
use crate::diary::handlers as diary;
use crate::doctors::handlers as doctors;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/api/debug/openai", get(health::openai_probe_handler))
        // Health diary
        .route("/api/diary/entry", post(diary::handle_create_entry))
        .route("/api/diary/entries", get(diary::handle_list_entries))
        .route("/api/diary/entries/:id", delete(diary::handle_delete_entry))
        .route("/api/diary/summary", get(diary::handle_summary))
        // Clinical notes
        .route("/api/clinical/transcribe", post(clinical::handle_transcribe))
        .route("/api/clinical/text-to-soap", post(clinical::handle_text_to_soap))
        .route("/ws/clinical/live", get(live::handle_live))
        // Doctor lookup
        .route("/api/doctors", get(doctors::handle_search_doctors))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
