//! HTTP surface for registration and detection.
//!
//! Two multipart endpoints mirror the CLI operations: `POST /register`
//! (name + mood-prefixed file fields) and `POST /detect` (name + one file).
//! Rejected verifications return 403 with a fixed message; the similarity
//! score never leaves the process.

use crate::audio;
use crate::detect::{self, DetectionError};
use crate::embedding::{EmbeddingError, VoiceEncoder};
use crate::enroll::{self, MoodSample, RegistrationError};
use crate::mood::Mood;
use crate::store::ProfileStore;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error, info};

/// Upload cap: a registration carries several WAV files.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Shared state for the detection service.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ProfileStore>,
    pub encoder: Arc<Mutex<Box<dyn VoiceEncoder>>>,
}

impl AppState {
    pub fn new(store: ProfileStore, encoder: Box<dyn VoiceEncoder>) -> Self {
        Self {
            store: Arc::new(store),
            encoder: Arc::new(Mutex::new(encoder)),
        }
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register_handler))
        .route("/detect", post(detect_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Mood detection service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "healthy": true,
        "service": "moodgate",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn register_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut name: Option<String> = None;
    let mut uploads: Vec<(Mood, Bytes)> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return bad_request(format!("Malformed multipart request: {}", e)),
        };
        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };

        if field_name == "name" {
            match field.text().await {
                Ok(text) => name = Some(text.trim().to_string()),
                Err(e) => return bad_request(format!("Malformed name field: {}", e)),
            }
        } else if let Some(mood) = Mood::from_prefix(&field_name) {
            match field.bytes().await {
                Ok(bytes) => uploads.push((mood, bytes)),
                Err(e) => return bad_request(format!("Malformed file field: {}", e)),
            }
        } else {
            debug!("Ignoring unknown multipart field '{}'", field_name);
        }
    }

    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return bad_request("Name is required".to_string());
    };

    let mut samples = Vec::with_capacity(uploads.len());
    for (mood, bytes) in uploads {
        match audio::decode_wav_bytes(&bytes) {
            Ok(wave) => samples.push(MoodSample::new(mood, wave)),
            Err(e) => return bad_request(format!("Invalid audio upload: {}", e)),
        }
    }

    let store = state.store.clone();
    let encoder = state.encoder.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut guard = encoder.lock().map_err(|_| {
            RegistrationError::Embedding(EmbeddingError::Inference(
                "encoder lock poisoned".to_string(),
            ))
        })?;
        enroll::register(&name, &samples, guard.as_mut(), &store)
    })
    .await;

    match result {
        Ok(Ok(profile)) => (
            StatusCode::OK,
            Json(json!({
                "message": format!("User {} registered successfully.", profile.name)
            })),
        ),
        Ok(Err(e)) => (registration_status(&e), Json(json!({ "error": e.to_string() }))),
        Err(e) => {
            error!("Registration task failed: {}", e);
            internal_error()
        }
    }
}

async fn detect_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut name: Option<String> = None;
    let mut file: Option<Bytes> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return bad_request(format!("Malformed multipart request: {}", e)),
        };
        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };

        match field_name.as_str() {
            "name" => match field.text().await {
                Ok(text) => name = Some(text.trim().to_string()),
                Err(e) => return bad_request(format!("Malformed name field: {}", e)),
            },
            "file" => match field.bytes().await {
                Ok(bytes) => file = Some(bytes),
                Err(e) => return bad_request(format!("Malformed file field: {}", e)),
            },
            other => debug!("Ignoring unknown multipart field '{}'", other),
        }
    }

    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return bad_request("Name is required".to_string());
    };
    let Some(file) = file else {
        return bad_request("Audio file is required".to_string());
    };

    let recording = match audio::decode_wav_bytes(&file) {
        Ok(wave) => wave,
        Err(e) => return bad_request(format!("Invalid audio upload: {}", e)),
    };

    let store = state.store.clone();
    let encoder = state.encoder.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut guard = encoder.lock().map_err(|_| {
            DetectionError::Embedding(EmbeddingError::Inference(
                "encoder lock poisoned".to_string(),
            ))
        })?;
        detect::detect(&name, &recording, guard.as_mut(), &store)
    })
    .await;

    match result {
        Ok(Ok(detection)) => (
            StatusCode::OK,
            Json(json!({ "mood": detection.mood.as_str() })),
        ),
        Ok(Err(e)) => (detection_status(&e), Json(json!({ "error": e.to_string() }))),
        Err(e) => {
            error!("Detection task failed: {}", e);
            internal_error()
        }
    }
}

fn registration_status(err: &RegistrationError) -> StatusCode {
    match err {
        RegistrationError::DuplicateName(_) | RegistrationError::MissingMood(_) => {
            StatusCode::BAD_REQUEST
        }
        RegistrationError::Embedding(EmbeddingError::InvalidAudio(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn detection_status(err: &DetectionError) -> StatusCode {
    match err {
        DetectionError::ProfileNotFound(_) => StatusCode::NOT_FOUND,
        DetectionError::VerificationFailed => StatusCode::FORBIDDEN,
        DetectionError::Embedding(EmbeddingError::InvalidAudio(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn bad_request(message: String) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn internal_error() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
}
