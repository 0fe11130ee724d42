use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::{error::EngineError, middleware::AuthUser, services::roster, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/teams", get(my_teams))
}

// GET /api/teams - команды вызывающего с цветом и ролью,
// кормит переключатель области просмотра в календаре
async fn my_teams(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, EngineError> {
    let teams = roster::teams_of(&state.db.pool, user.user_id).await?;
    Ok(Json(json!({ "teams": teams })))
}
