use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::EngineError,
    middleware::AuthUser,
    models::RsvpStatus,
    services::rsvp,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rsvps/respond", patch(respond))
        .route("/rsvps", get(event_rsvps))
}

// PATCH /api/rsvps/respond
#[derive(Debug, Deserialize)]
struct RespondRequest {
    event_id: i64,
    status: String,
    // None = клиент не спрашивал, Some("") = пользователь пропустил поле
    decline_reason: Option<String>,
    // Родитель отвечает за конкретного ребёнка
    player_id: Option<i64>,
}

async fn respond(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<RespondRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let status = RsvpStatus::parse(&req.status).ok_or_else(|| {
        EngineError::Validation("status: допустимы yes | no | maybe | pending".to_string())
    })?;

    let saved = rsvp::respond(
        &state,
        req.event_id,
        user.user_id,
        req.player_id,
        status,
        req.decline_reason,
    )
    .await?;

    Ok(Json(saved))
}

// GET /api/rsvps?event_id=N - счётчики по статусам плюс мой ответ
#[derive(Debug, Deserialize)]
struct EventRsvpsQuery {
    event_id: i64,
}

async fn event_rsvps(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<EventRsvpsQuery>,
) -> Result<impl IntoResponse, EngineError> {
    let counts = rsvp::counts(&state, params.event_id).await?;
    let mine = rsvp::mine(&state, params.event_id, user.user_id).await?;

    Ok(Json(json!({ "counts": counts, "mine": mine })))
}
