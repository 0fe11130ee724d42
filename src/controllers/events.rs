use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::EngineError,
    middleware::AuthUser,
    services::{
        aggregate::{self, TeamScope},
        events::{self, EventDraft, EventPatch},
        roster,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events", post(create_event))
        .route("/events", delete(delete_event))
        .route("/events/recurring", post(create_recurring_events))
        .route("/events/update", patch(update_event))
        .route("/events/cancel", patch(cancel_event))
        .route("/events/restore", patch(restore_event))
}

/* ---------- helpers ---------- */

// Мутации расписания доступны только staff-роли команды события
async fn require_staff(
    state: &AppState,
    user: &AuthUser,
    team_id: i64,
) -> Result<(), EngineError> {
    if roster::is_staff(&state.db.pool, user.user_id, team_id).await? {
        Ok(())
    } else {
        Err(EngineError::Forbidden)
    }
}

/* ---------- просмотр ---------- */

// GET /api/events?scope=all|{team_id}&from=YYYY-MM-DD&to=YYYY-MM-DD
#[derive(Debug, Deserialize)]
struct ListEventsQuery {
    scope: String,
    from: NaiveDate,
    to: NaiveDate,
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<ListEventsQuery>,
) -> Result<impl IntoResponse, EngineError> {
    let scope = TeamScope::parse(&params.scope).ok_or_else(|| {
        EngineError::Validation("scope: либо all, либо идентификатор команды".to_string())
    })?;

    let views =
        aggregate::events_in_range(&state, user.user_id, scope, params.from, params.to).await?;

    let count = views.len();
    Ok(Json(json!({ "events": views, "count": count })))
}

/* ---------- создание ---------- */

// POST /api/events
async fn create_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(draft): Json<EventDraft>,
) -> Result<impl IntoResponse, EngineError> {
    require_staff(&state, &user, draft.team_id).await?;

    let event = events::create_single(&state, user.user_id, draft).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

// POST /api/events/recurring
#[derive(Debug, Deserialize)]
struct CreateRecurringRequest {
    #[serde(flatten)]
    draft: EventDraft,
    range_start: NaiveDate,
    range_end: NaiveDate,
    // Коды дней недели: sun..sat
    weekdays: Vec<String>,
}

async fn create_recurring_events(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateRecurringRequest>,
) -> Result<impl IntoResponse, EngineError> {
    require_staff(&state, &user, req.draft.team_id).await?;

    let created = events::create_recurring(
        &state,
        user.user_id,
        req.draft,
        req.range_start,
        req.range_end,
        &req.weekdays,
    )
    .await?;

    let count = created.len();
    Ok((
        StatusCode::CREATED,
        Json(json!({ "events": created, "count": count })),
    ))
}

/* ---------- изменение ---------- */

// PATCH /api/events/update
#[derive(Debug, Deserialize)]
struct UpdateEventRequest {
    event_id: i64,
    #[serde(flatten)]
    patch: EventPatch,
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let existing = events::fetch_event(&state.db.pool, req.event_id).await?;
    require_staff(&state, &user, existing.team_id).await?;

    let updated = events::update(&state, existing, req.patch).await?;
    Ok(Json(updated))
}

// PATCH /api/events/cancel
#[derive(Debug, Deserialize)]
struct CancelEventRequest {
    event_id: i64,
    reason: Option<String>,
}

async fn cancel_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CancelEventRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let existing = events::fetch_event(&state.db.pool, req.event_id).await?;
    require_staff(&state, &user, existing.team_id).await?;

    let event = events::cancel(&state, req.event_id, req.reason).await?;
    Ok(Json(event))
}

// PATCH /api/events/restore
#[derive(Debug, Deserialize)]
struct RestoreEventRequest {
    event_id: i64,
}

async fn restore_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<RestoreEventRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let existing = events::fetch_event(&state.db.pool, req.event_id).await?;
    require_staff(&state, &user, existing.team_id).await?;

    let event = events::restore(&state, req.event_id).await?;
    Ok(Json(event))
}

/* ---------- удаление ---------- */

// DELETE /api/events?event_id=N[&scope=future]
#[derive(Debug, Deserialize)]
struct DeleteEventQuery {
    event_id: i64,
    // "future" = эта строка и все будущие в её группе
    scope: Option<String>,
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<DeleteEventQuery>,
) -> Result<impl IntoResponse, EngineError> {
    let existing = events::fetch_event(&state.db.pool, params.event_id).await?;
    require_staff(&state, &user, existing.team_id).await?;

    match params.scope.as_deref() {
        Some("future") => {
            let deleted = events::delete_group_from_date(&state, &existing).await?;
            Ok(Json(json!({
                "message": "Событие и все будущие повторы удалены",
                "deleted": deleted
            })))
        }
        Some(other) => Err(EngineError::Validation(format!(
            "scope: неизвестное значение {}",
            other
        ))),
        None => {
            events::delete_single(&state, &existing).await?;
            Ok(Json(json!({ "message": "Событие удалено", "deleted": 1 })))
        }
    }
}
