use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::Row;
use std::sync::Arc;

use crate::domain::catalog::{Category, Country, Municipality};
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/countries", get(countries))
        .route("/municipalities", get(municipalities))
        .route("/categories", get(categories))
}

async fn countries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rows = sqlx::query("SELECT id, nombre FROM paises ORDER BY nombre")
        .fetch_all(&state.db)
        .await?;
    let paises: Vec<Country> = rows
        .iter()
        .map(|r| Country {
            id: r.get("id"),
            nombre: r.get("nombre"),
        })
        .collect();
    Ok(Json(json!({ "ok": true, "paises": paises })))
}

#[derive(Deserialize)]
struct MunicipalityParams {
    pais: Option<i32>,
}

async fn municipalities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MunicipalityParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rows = sqlx::query(
        "SELECT id, nombre, pais_id FROM municipios
         WHERE ($1::int IS NULL OR pais_id = $1) ORDER BY nombre",
    )
    .bind(params.pais)
    .fetch_all(&state.db)
    .await?;
    let municipios: Vec<Municipality> = rows
        .iter()
        .map(|r| Municipality {
            id: r.get("id"),
            nombre: r.get("nombre"),
            pais_id: r.get("pais_id"),
        })
        .collect();
    Ok(Json(json!({ "ok": true, "municipios": municipios })))
}

async fn categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rows = sqlx::query("SELECT id, nombre FROM categorias ORDER BY nombre")
        .fetch_all(&state.db)
        .await?;
    let categorias: Vec<Category> = rows
        .iter()
        .map(|r| Category {
            id: r.get("id"),
            nombre: r.get("nombre"),
        })
        .collect();
    Ok(Json(json!({ "ok": true, "categorias": categorias })))
}
