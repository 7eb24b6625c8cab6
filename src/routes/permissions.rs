use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::infra::users;
use crate::middleware::auth::CurrentUser;
use crate::security::permissions;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/permissions/check", get(check))
}

#[derive(Deserialize)]
struct CheckParams {
    capability: String,
    role: Option<i32>,
}

/// Explicit `role` param wins (administrative lookups); otherwise the
/// caller's own role is consulted, which requires a session.
async fn check(
    State(state): State<Arc<AppState>>,
    caller: Option<CurrentUser>,
    Query(params): Query<CheckParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rol_id = match params.role {
        Some(role) => role,
        None => {
            let caller = caller.ok_or(ApiError::Unauthorized)?;
            users::load_active(&state.db, caller.id).await?.rol_id
        }
    };

    let allowed = permissions::role_has(&state.db, rol_id, &params.capability).await?;
    Ok(Json(json!({
        "ok": true,
        "role": rol_id,
        "capability": params.capability,
        "allowed": allowed,
    })))
}
