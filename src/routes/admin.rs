use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use sqlx::Row;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::infra::users;
use crate::middleware::auth::CurrentUser;
use crate::security::permissions::{self, capability};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}/toggle-active", put(toggle_active))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = users::load_active(&state.db, caller.id).await?;
    permissions::require(&state.db, user.rol_id, capability::VIEW_DASHBOARD).await?;

    let usuarios: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usuarios")
        .fetch_one(&state.db)
        .await?;
    let aprobados: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM eventos WHERE estado = true")
        .fetch_one(&state.db)
        .await?;
    let pendientes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM eventos WHERE estado = false")
        .fetch_one(&state.db)
        .await?;

    Ok(Json(json!({
        "ok": true,
        "usuarios": usuarios,
        "eventos_aprobados": aprobados,
        "eventos_pendientes": pendientes,
    })))
}

#[derive(Serialize)]
struct UserEntry {
    id: Uuid,
    correo: String,
    nombre: Option<String>,
    rol_id: i32,
    activo: bool,
    verificado: bool,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = users::load_active(&state.db, caller.id).await?;
    permissions::require(&state.db, user.rol_id, capability::MANAGE_USERS).await?;

    let rows = sqlx::query(
        "SELECT id, correo, nombre, rol_id, activo, verificado FROM usuarios
         ORDER BY created_at DESC LIMIT 50",
    )
    .fetch_all(&state.db)
    .await?;

    let usuarios: Vec<UserEntry> = rows
        .iter()
        .map(|r| UserEntry {
            id: r.get("id"),
            correo: r.get("correo"),
            nombre: r.get("nombre"),
            rol_id: r.get("rol_id"),
            activo: r.get("activo"),
            verificado: r.get("verificado"),
        })
        .collect();

    Ok(Json(json!({ "ok": true, "usuarios": usuarios })))
}

/// Ban/unban. Accounts are never hard-deleted; `activo = false` locks out
/// both password and Google logins.
async fn toggle_active(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = users::load_active(&state.db, caller.id).await?;
    permissions::require(&state.db, user.rol_id, capability::MANAGE_USERS).await?;

    let activo: bool = sqlx::query_scalar(
        "UPDATE usuarios SET activo = NOT activo, updated_at = now() WHERE id = $1 RETURNING activo",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(json!({ "ok": true, "activo": activo })))
}
