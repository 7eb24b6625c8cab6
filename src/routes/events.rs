use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::event::{Event, Rating};
use crate::error::ApiError;
use crate::infra::users;
use crate::middleware::auth::CurrentUser;
use crate::security::permissions::{self, capability};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(event_detail))
        .route("/events/{id}/toggle-status", put(toggle_status))
        .route(
            "/events/{id}/valoraciones",
            post(submit_rating).get(list_ratings),
        )
}

const EVENT_COLUMNS: &str = "id, titulo, descripcion, categoria_id, municipio_id, \
                             fecha_inicio, fecha_fin, imagen, estado";

fn map_event(row: PgRow) -> Event {
    Event {
        id: row.get("id"),
        titulo: row.get("titulo"),
        descripcion: row.get("descripcion"),
        categoria_id: row.get("categoria_id"),
        municipio_id: row.get("municipio_id"),
        fecha_inicio: row.get("fecha_inicio"),
        fecha_fin: row.get("fecha_fin"),
        imagen: row.get("imagen"),
        estado: row.get("estado"),
    }
}

#[derive(Deserialize)]
struct ListParams {
    categoria: Option<i32>,
    municipio: Option<i32>,
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let rows = sqlx::query(&format!(
        "SELECT {EVENT_COLUMNS} FROM eventos
         WHERE estado = true
           AND ($1::int IS NULL OR categoria_id = $1)
           AND ($2::int IS NULL OR municipio_id = $2)
         ORDER BY fecha_inicio
         LIMIT $3 OFFSET $4"
    ))
    .bind(params.categoria)
    .bind(params.municipio)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    let eventos: Vec<Event> = rows.into_iter().map(map_event).collect();
    Ok(Json(json!({ "ok": true, "eventos": eventos })))
}

async fn event_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Pending events are invisible to the public.
    let row = sqlx::query(&format!(
        "SELECT {EVENT_COLUMNS} FROM eventos WHERE id = $1 AND estado = true"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("event"))?;

    Ok(Json(json!({ "ok": true, "evento": map_event(row) })))
}

#[derive(Deserialize)]
struct CreateEventPayload {
    titulo: String,
    descripcion: Option<String>,
    categoria_id: i32,
    municipio_id: i32,
    #[serde(with = "time::serde::rfc3339")]
    fecha_inicio: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    fecha_fin: Option<OffsetDateTime>,
    imagen: Option<String>,
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    Json(payload): Json<CreateEventPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let user = users::load_active(&state.db, caller.id).await?;
    permissions::require(&state.db, user.rol_id, capability::CREATE_EVENT).await?;

    if payload.titulo.trim().is_empty() {
        return Err(ApiError::Validation("título requerido".into()));
    }

    let id = Uuid::new_v4();
    // New events await approval (estado = false).
    sqlx::query(
        "INSERT INTO eventos (id, titulo, descripcion, categoria_id, municipio_id, \
         fecha_inicio, fecha_fin, imagen, estado, creador_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, false, $9, now(), now())",
    )
    .bind(id)
    .bind(payload.titulo.trim())
    .bind(&payload.descripcion)
    .bind(payload.categoria_id)
    .bind(payload.municipio_id)
    .bind(payload.fecha_inicio)
    .bind(payload.fecha_fin)
    .bind(&payload.imagen)
    .bind(user.id)
    .execute(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "id": id }))))
}

/// Approval is one-directional: once `estado` is true the toggle refuses to
/// flip it back.
async fn toggle_status(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = users::load_active(&state.db, caller.id).await?;
    permissions::require(&state.db, user.rol_id, capability::APPROVE_EVENT).await?;

    let estado: bool = sqlx::query_scalar("SELECT estado FROM eventos WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("event"))?;

    if estado {
        return Err(ApiError::Validation("only approval permitted".into()));
    }

    sqlx::query("UPDATE eventos SET estado = true, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "ok": true, "estado": true })))
}

#[derive(Deserialize)]
struct RatingPayload {
    puntuacion: i16,
    comentario: Option<String>,
}

fn validate_puntuacion(puntuacion: i16) -> bool {
    (1..=5).contains(&puntuacion)
}

async fn submit_rating(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RatingPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !validate_puntuacion(payload.puntuacion) {
        return Err(ApiError::Validation("puntuación debe estar entre 1 y 5".into()));
    }
    let user = users::load_active(&state.db, caller.id).await?;

    // Only approved events accept ratings; anything else looks like 404.
    let estado: Option<bool> = sqlx::query_scalar("SELECT estado FROM eventos WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    if estado != Some(true) {
        return Err(ApiError::NotFound("event"));
    }

    // One rating per (event, user); resubmission replaces.
    sqlx::query(
        "INSERT INTO valoraciones (evento_id, usuario_id, puntuacion, comentario, created_at, updated_at)
         VALUES ($1, $2, $3, $4, now(), now())
         ON CONFLICT (evento_id, usuario_id)
         DO UPDATE SET puntuacion = EXCLUDED.puntuacion, comentario = EXCLUDED.comentario, updated_at = now()",
    )
    .bind(id)
    .bind(user.id)
    .bind(payload.puntuacion)
    .bind(&payload.comentario)
    .execute(&state.db)
    .await?;

    Ok(Json(json!({ "ok": true })))
}

async fn list_ratings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM eventos WHERE id = $1 AND estado = true)",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await?;
    if !exists {
        return Err(ApiError::NotFound("event"));
    }

    let rows = sqlx::query(
        "SELECT u.nombre, u.apellidos, u.correo, v.puntuacion, v.comentario, v.created_at
         FROM valoraciones v JOIN usuarios u ON u.id = v.usuario_id
         WHERE v.evento_id = $1 ORDER BY v.created_at DESC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    let valoraciones: Vec<Rating> = rows
        .iter()
        .map(|row| {
            let nombre: Option<String> = row.get("nombre");
            let apellidos: Option<String> = row.get("apellidos");
            let correo: String = row.get("correo");
            let usuario = match (nombre, apellidos) {
                (Some(n), Some(a)) => format!("{n} {a}"),
                (Some(n), None) => n,
                _ => correo,
            };
            Rating {
                usuario,
                puntuacion: row.get("puntuacion"),
                comentario: row.get("comentario"),
                created_at: row.get("created_at"),
            }
        })
        .collect();

    let media: Option<f64> =
        sqlx::query_scalar("SELECT AVG(puntuacion)::float8 FROM valoraciones WHERE evento_id = $1")
            .bind(id)
            .fetch_one(&state.db)
            .await?;

    Ok(Json(json!({
        "ok": true,
        "media": media,
        "total": valoraciones.len(),
        "valoraciones": valoraciones,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn puntuacion_must_be_one_to_five() {
        assert!(validate_puntuacion(1));
        assert!(validate_puntuacion(5));
        assert!(!validate_puntuacion(0));
        assert!(!validate_puntuacion(6));
        assert!(!validate_puntuacion(-3));
    }
}
