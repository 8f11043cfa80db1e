//! Live dictation over WebSocket.
//!
//! One connection runs four cooperating parts:
//! - the reader loop (socket frames → audio channel),
//! - a recognition task (audio → interim/final transcript events),
//! - a refresh task that folds pending final fragments into the note once per interval,
//! - a writer task (event channel → socket).
//!
//! Note updates are applied only when their revision is newer than the note's current one.
//! Refreshes run one at a time on the refresh task, and the closing refresh takes the next
//! revision, so a slow response can never overwrite newer content.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use bytes::Bytes;
use futures_util::{
    stream::{SplitStream, StreamExt},
    SinkExt,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::clinical::differential::build_differential;
use crate::clinical::pipeline::{
    extract_entities, fallback_soap_note, generate_soap_note, update_soap_note, NoteContext,
};
use crate::llm_client::ChatCompletion;
use crate::models::clinical::{DifferentialDiagnosis, HealthAnalysis, HealthEntity, SoapNote};
use crate::speech::stream::{run_recognition, RecognitionEvent, SegmentPolicy};
use crate::state::AppState;

const DEFAULT_LANGUAGE: &str = "en-US";

/// How long trailing audio may take to recognize after the client stops.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

const AUDIO_QUEUE: usize = 256;
const EVENT_QUEUE: usize = 64;

// ────────────────────────────────────────────────────────────────────────────
// Protocol
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Init {
        #[serde(default)]
        language: Option<String>,
        #[serde(default)]
        diary_context: Option<String>,
        #[serde(default)]
        patient_gender: Option<String>,
    },
    Stop,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Ready,
    Interim {
        text: String,
    },
    Final {
        text: String,
    },
    NoteUpdate {
        revision: u64,
        soap_note: SoapNote,
    },
    Complete {
        transcript: String,
        soap_note: SoapNote,
        health_entities: Vec<HealthEntity>,
        differential_diagnosis: DifferentialDiagnosis,
    },
    Error {
        message: String,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Per-connection note state
// ────────────────────────────────────────────────────────────────────────────

/// Work captured for one refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshJob {
    pub revision: u64,
    /// Final fragments not yet folded into the note.
    pub fragments: String,
    pub transcript: String,
    pub current: Option<SoapNote>,
}

#[derive(Debug, Default)]
pub struct NoteState {
    fragments: Vec<String>,
    pending: Vec<String>,
    note: Option<SoapNote>,
    issued_revision: u64,
    applied_revision: u64,
}

impl NoteState {
    pub fn push_final(&mut self, text: &str) {
        self.fragments.push(text.to_string());
        self.pending.push(text.to_string());
    }

    pub fn transcript(&self) -> String {
        self.fragments.join(" ")
    }

    /// Reserves a revision newer than every one handed out so far.
    pub fn next_revision(&mut self) -> u64 {
        self.issued_revision += 1;
        self.issued_revision
    }

    /// Drains pending fragments into a job, or `None` when nothing new arrived.
    pub fn begin_refresh(&mut self) -> Option<RefreshJob> {
        if self.pending.is_empty() {
            return None;
        }
        let fragments = std::mem::take(&mut self.pending).join(" ");
        Some(RefreshJob {
            revision: self.next_revision(),
            fragments,
            transcript: self.transcript(),
            current: self.note.clone(),
        })
    }

    /// Stores `note` when `revision` is newer than the current one. Returns whether it was applied.
    pub fn apply(&mut self, revision: u64, note: SoapNote) -> bool {
        if revision <= self.applied_revision {
            debug!(
                "Dropping stale note revision {revision} (current {})",
                self.applied_revision
            );
            return false;
        }
        self.applied_revision = revision;
        self.note = Some(note);
        true
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handler
// ────────────────────────────────────────────────────────────────────────────

/// GET /ws/clinical/live
pub async fn handle_live(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

async fn run_session(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (events, mut event_rx) = mpsc::channel::<ServerEvent>(EVENT_QUEUE);

    let writer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Could not serialize live event: {e}");
                    continue;
                }
            };
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    run_dictation(&state, &mut stream, &events).await;

    drop(events);
    let _ = writer.await;
}

async fn run_dictation(
    state: &AppState,
    stream: &mut SplitStream<WebSocket>,
    events: &mpsc::Sender<ServerEvent>,
) {
    let Some((language, context)) = wait_for_init(stream).await else {
        send_error(events, "Expected an init message before audio").await;
        return;
    };

    let Some(stt) = state.speech.clone() else {
        send_error(events, "Azure Speech service not configured").await;
        return;
    };

    info!("Live dictation started (language: {language})");
    let _ = events.send(ServerEvent::Ready).await;

    let notes = Arc::new(Mutex::new(NoteState::default()));
    let context = Arc::new(context);

    let (audio_tx, audio_rx) = mpsc::channel::<Bytes>(AUDIO_QUEUE);
    let (recognized_tx, recognized_rx) = mpsc::channel::<RecognitionEvent>(EVENT_QUEUE);

    let recognition = tokio::spawn(run_recognition(
        stt,
        language,
        SegmentPolicy::default(),
        audio_rx,
        recognized_tx,
    ));
    let forwarder = tokio::spawn(forward_recognition(
        recognized_rx,
        notes.clone(),
        events.clone(),
    ));
    let refresher = tokio::spawn(refresh_loop(
        state.clone(),
        notes.clone(),
        context.clone(),
        events.clone(),
        state.config.live_refresh_interval,
    ));

    let client_gone = read_audio(stream, &audio_tx, events).await;

    refresher.abort();
    drop(audio_tx);

    let drain = recognition.abort_handle();
    if tokio::time::timeout(DRAIN_GRACE, recognition).await.is_err() {
        warn!("Recognition did not drain within {DRAIN_GRACE:?}, dropping trailing audio");
        drain.abort();
    }
    let _ = forwarder.await;

    if client_gone {
        debug!("Client disconnected before stop, skipping final note");
        return;
    }

    let complete = finish_session(state, &notes, &context).await;
    let _ = events.send(complete).await;
    info!("Live dictation completed");
}

/// Waits for the opening `init` message.
async fn wait_for_init(stream: &mut SplitStream<WebSocket>) -> Option<(String, NoteContext)> {
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => {
                return match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Init {
                        language,
                        diary_context,
                        patient_gender,
                    }) => Some((
                        language
                            .filter(|l| !l.trim().is_empty())
                            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
                        NoteContext {
                            diary_context,
                            patient_gender,
                        },
                    )),
                    _ => None,
                };
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            _ => return None,
        }
    }
    None
}

/// Forwards audio until `stop`. Returns `true` when the client went away instead.
async fn read_audio(
    stream: &mut SplitStream<WebSocket>,
    audio: &mpsc::Sender<Bytes>,
    events: &mpsc::Sender<ServerEvent>,
) -> bool {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Binary(data)) => {
                if audio.send(Bytes::from(data)).await.is_err() {
                    warn!("Recognition task ended early");
                    return false;
                }
            }
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Stop) => return false,
                Ok(ClientMessage::Init { .. }) => debug!("Ignoring repeated init"),
                Err(e) => send_error(events, &format!("Unrecognized message: {e}")).await,
            },
            Ok(Message::Close(_)) => return true,
            Ok(_) => {}
            Err(e) => {
                warn!("Live socket error: {e}");
                return true;
            }
        }
    }
    true
}

async fn send_error(events: &mpsc::Sender<ServerEvent>, message: &str) {
    let _ = events
        .send(ServerEvent::Error {
            message: message.to_string(),
        })
        .await;
}

async fn forward_recognition(
    mut recognized: mpsc::Receiver<RecognitionEvent>,
    notes: Arc<Mutex<NoteState>>,
    events: mpsc::Sender<ServerEvent>,
) {
    while let Some(event) = recognized.recv().await {
        let event = match event {
            RecognitionEvent::Interim(text) => ServerEvent::Interim { text },
            RecognitionEvent::Final(text) => {
                notes.lock().await.push_final(&text);
                ServerEvent::Final { text }
            }
        };
        let _ = events.send(event).await;
    }
}

async fn refresh_loop(
    state: AppState,
    notes: Arc<Mutex<NoteState>>,
    context: Arc<NoteContext>,
    events: mpsc::Sender<ServerEvent>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        refresh_once(state.llm(), &notes, &context, &events).await;
    }
}

/// Folds pending fragments into the note. Returns whether a new revision was applied.
pub async fn refresh_once(
    llm: Option<&dyn ChatCompletion>,
    notes: &Mutex<NoteState>,
    context: &NoteContext,
    events: &mpsc::Sender<ServerEvent>,
) -> bool {
    let Some(job) = notes.lock().await.begin_refresh() else {
        return false;
    };

    let note = match &job.current {
        Some(current) => update_soap_note(llm, current, &job.fragments, context).await,
        None => {
            generate_soap_note(llm, &job.transcript, &HealthAnalysis::default(), context).await
        }
    };

    if !notes.lock().await.apply(job.revision, note.clone()) {
        return false;
    }
    let _ = events
        .send(ServerEvent::NoteUpdate {
            revision: job.revision,
            soap_note: note,
        })
        .await;
    true
}

/// Full refresh over the whole transcript, producing the `complete` event.
async fn finish_session(
    state: &AppState,
    notes: &Mutex<NoteState>,
    context: &NoteContext,
) -> ServerEvent {
    let (transcript, revision) = {
        let mut notes = notes.lock().await;
        (notes.transcript(), notes.next_revision())
    };

    if transcript.trim().is_empty() {
        return ServerEvent::Complete {
            transcript,
            soap_note: fallback_soap_note(""),
            health_entities: vec![],
            differential_diagnosis: DifferentialDiagnosis {
                method: "rule_based".to_string(),
                ..Default::default()
            },
        };
    }

    let analysis = extract_entities(state.health_nlp.as_deref(), &transcript).await;
    let soap_note = generate_soap_note(state.llm(), &transcript, &analysis, context).await;
    let differential_diagnosis = build_differential(
        state.llm(),
        state.conditions.as_ref(),
        &transcript,
        &analysis,
    )
    .await;

    notes.lock().await.apply(revision, soap_note.clone());

    ServerEvent::Complete {
        transcript,
        soap_note,
        health_entities: analysis.entities,
        differential_diagnosis,
    }
}
