use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info};
use trip_flow::{
    AnalyticsSummary, InteractionRecorder, ItineraryResponse, StoredInteraction, TripController,
    TripSession, TurnInput, TurnStatus, summarize,
};
use uuid::Uuid;

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub controller: TripController,
    pub recorder: Arc<dyn InteractionRecorder>,
}

/// Message from the chat client. `preferences` carries the free-text answer for
/// whichever slot is being asked, as the browser client sends it.
#[derive(Debug, Deserialize)]
pub struct CreateItineraryRequest {
    pub session_id: Option<String>,
    pub preferences: String,
    pub duration: Option<i64>,
    pub budget: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CreateItineraryResponse {
    pub session_id: String,
    pub status: TurnStatus,
    #[serde(flatten)]
    pub response: ItineraryResponse,
}

#[derive(Debug, Deserialize)]
pub struct InteractionsQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClearQuery {
    pub oldest: u32,
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/create-itinerary", post(create_itinerary))
        .route("/session/{id}", get(get_session).delete(reset_session))
        .route(
            "/api/interactions",
            get(list_interactions).delete(clear_interactions),
        )
        .route("/api/analytics/summary", get(analytics_summary))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn create_itinerary(
    State(state): State<AppState>,
    Json(request): Json<CreateItineraryRequest>,
) -> ApiResult<CreateItineraryResponse> {
    let session_id = match request.session_id {
        Some(id) if id.trim().is_empty() => {
            return Err(bad_request_error("session_id must not be blank"));
        }
        Some(id) => id,
        None => Uuid::new_v4().to_string(),
    };

    info!(
        session_id = %session_id,
        content_length = request.preferences.len(),
        "Processing itinerary message"
    );

    let input = TurnInput {
        message: request.preferences,
        duration: request.duration,
        budget: request.budget,
    };

    let result = state
        .controller
        .advance(&session_id, input)
        .await
        .map_err(|e| {
            error!(session_id = %session_id, error = %e, "Failed to advance session");
            internal_error("Failed to process message", &e.to_string())
        })?;

    info!(session_id = %session_id, status = ?result.status, "Message processed");

    Ok(Json(CreateItineraryResponse {
        session_id,
        status: result.status,
        response: result.response,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<TripSession> {
    match state.controller.session(&session_id).await {
        Ok(Some(session)) => Ok(Json(session)),
        Ok(None) => Err(not_found_error("Session not found", &session_id)),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to get session");
            Err(internal_error("Failed to get session", &e.to_string()))
        }
    }
}

async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    state.controller.reset(&session_id).await.map_err(|e| {
        error!(session_id = %session_id, error = %e, "Failed to reset session");
        internal_error("Failed to reset session", &e.to_string())
    })?;

    Ok(Json(json!({ "session_id": session_id, "status": "reset" })))
}

async fn list_interactions(
    State(state): State<AppState>,
    Query(query): Query<InteractionsQuery>,
) -> ApiResult<Vec<StoredInteraction>> {
    state
        .recorder
        .list(query.session_id.as_deref())
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "Failed to list interactions");
            internal_error("Failed to list interactions", &e.to_string())
        })
}

async fn clear_interactions(
    State(state): State<AppState>,
    Query(query): Query<ClearQuery>,
) -> ApiResult<Value> {
    let removed = state.recorder.clear_oldest(query.oldest).await.map_err(|e| {
        error!(error = %e, "Failed to clear interactions");
        internal_error("Failed to clear interactions", &e.to_string())
    })?;

    info!(requested = query.oldest, removed, "Cleared oldest interactions");
    Ok(Json(json!({ "removed": removed })))
}

async fn analytics_summary(State(state): State<AppState>) -> ApiResult<AnalyticsSummary> {
    let interactions = state.recorder.list(None).await.map_err(|e| {
        error!(error = %e, "Failed to load interactions for analytics");
        internal_error("Failed to load interactions", &e.to_string())
    })?;

    Ok(Json(summarize(&interactions)))
}
