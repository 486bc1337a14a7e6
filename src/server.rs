//! HTTP API для инференса: применение сохранённого препроцессора к новым записям

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use crate::artifact;
use crate::error::PreprocessingError;
use crate::preprocessing::ColumnTransformer;
use crate::types::{ErrorResponse, FeatureNamesResponse, Table, TransformRequest, TransformResponse};

#[derive(Clone)]
pub struct AppState {
    preprocessor: Arc<RwLock<Option<ColumnTransformer>>>,
    artifact_path: PathBuf,
}

impl AppState {
    pub fn new(artifact_path: PathBuf, preprocessor: Option<ColumnTransformer>) -> Self {
        Self {
            preprocessor: Arc::new(RwLock::new(preprocessor)),
            artifact_path,
        }
    }

    /// Загрузка артефакта при старте; отсутствие файла не фатально
    pub fn load(artifact_path: PathBuf) -> Self {
        let preprocessor = match artifact::load_preprocessor(&artifact_path) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(path = %artifact_path.display(), error = %e, "Preprocessor not loaded");
                None
            }
        };
        Self::new(artifact_path, preprocessor)
    }
}

pub enum ApiError {
    NotLoaded,
    Preprocessing(PreprocessingError),
    Internal(String),
}

impl From<PreprocessingError> for ApiError {
    fn from(err: PreprocessingError) -> Self {
        ApiError::Preprocessing(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotLoaded => (
                StatusCode::SERVICE_UNAVAILABLE,
                "preprocessor is not loaded".to_string(),
            ),
            ApiError::Preprocessing(e @ PreprocessingError::Schema(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Preprocessing(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/features", get(features))
        .route("/api/transform", post(transform))
        .route("/api/reload", post(reload))
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Student performance preprocessing API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let loaded = state.preprocessor.read().await.is_some();
    Json(serde_json::json!({ "status": "ok", "preprocessor_loaded": loaded }))
}

async fn features(State(state): State<AppState>) -> Result<Json<FeatureNamesResponse>, ApiError> {
    let guard = state.preprocessor.read().await;
    let preprocessor = guard.as_ref().ok_or(ApiError::NotLoaded)?;
    Ok(Json(FeatureNamesResponse {
        feature_names: preprocessor.feature_names_out()?,
    }))
}

async fn transform(
    State(state): State<AppState>,
    Json(request): Json<TransformRequest>,
) -> Result<Json<TransformResponse>, ApiError> {
    tracing::info!("Transform request: {} records", request.records.len());

    let guard = state.preprocessor.read().await;
    let preprocessor = guard.as_ref().ok_or(ApiError::NotLoaded)?;
    let feature_names = preprocessor.feature_names_out()?;

    if request.records.is_empty() {
        return Ok(Json(TransformResponse {
            feature_names,
            features: Vec::new(),
        }));
    }

    let table = Table::from_records(&request.records)?;
    let matrix = preprocessor.transform(&table)?;
    Ok(Json(TransformResponse {
        feature_names,
        features: matrix.rows().into_iter().map(|row| row.to_vec()).collect(),
    }))
}

async fn reload(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let path = state.artifact_path.clone();
    let loaded = tokio::task::spawn_blocking(move || artifact::load_preprocessor(path))
        .await
        .map_err(|e| ApiError::Internal(format!("reload task failed: {}", e)))??;
    *state.preprocessor.write().await = Some(loaded);
    tracing::info!(path = %state.artifact_path.display(), "Preprocessor reloaded");
    Ok(Json(serde_json::json!({ "status": "reloaded" })))
}
