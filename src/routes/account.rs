use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::infra::users;
use crate::middleware::auth::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/me", get(me))
}

async fn me(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = users::load_active(&state.db, caller.id).await?;
    Ok(Json(json!({ "ok": true, "usuario": user })))
}
