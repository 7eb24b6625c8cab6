use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cookie::Cookie;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::ApiError;
use crate::infra::users::{self, NewUser};
use crate::security::config::SecurityConfig;
use crate::security::password;
use crate::state::AppState;
use sqlx::Row;

const EMAIL_TOKEN_TTL_HOURS: i64 = 24;
const RESET_PASSWORD_LEN: usize = 12;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/login-google", post(login_google))
        .route("/logout", post(logout))
        .route("/reset-password", post(reset_password))
        .route("/validate-email", get(validate_email))
}

fn validate_correo(correo: &str) -> bool {
    correo.contains('@') && correo.len() <= 255
}

fn validate_password(password: &str) -> bool {
    password.len() >= 8
}

#[derive(Deserialize)]
struct RegisterPayload {
    nombre: String,
    apellidos: String,
    correo: String,
    telefono: String,
    password: String,
    documento: Option<String>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterPayload>,
) -> Result<Response, ApiError> {
    let correo = payload.correo.trim().to_string();
    let telefono = payload.telefono.trim().to_string();
    let documento = payload
        .documento
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from);

    if !validate_correo(&correo) {
        return Err(ApiError::Validation("correo inválido".into()));
    }
    if telefono.is_empty() {
        return Err(ApiError::Validation("teléfono requerido".into()));
    }
    if payload.nombre.trim().is_empty() || payload.apellidos.trim().is_empty() {
        return Err(ApiError::Validation("nombre y apellidos requeridos".into()));
    }
    if !validate_password(&payload.password) {
        return Err(ApiError::Validation(
            "contraseña demasiado corta (mínimo 8 caracteres)".into(),
        ));
    }

    let duplicates =
        users::duplicate_fields(&state.db, &correo, &telefono, documento.as_deref()).await?;
    if !duplicates.is_empty() {
        return Err(ApiError::Conflict(duplicates));
    }

    let hash = password::hash_password(&payload.password).map_err(|_| ApiError::Internal)?;
    let user_id = users::insert_local(
        &state.db,
        &NewUser {
            documento,
            nombre: payload.nombre.trim().to_string(),
            apellidos: payload.apellidos.trim().to_string(),
            correo: correo.clone(),
            telefono,
            hash,
        },
    )
    .await?;

    let (raw_token, token_hash) = one_time_token();
    let expires_at = OffsetDateTime::now_utc() + Duration::hours(EMAIL_TOKEN_TTL_HOURS);
    sqlx::query(
        "INSERT INTO tokens_validacion (id, usuario_id, token_hash, expires_at, used, created_at)
         VALUES ($1, $2, $3, $4, false, now())",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&token_hash)
    .bind(expires_at)
    .execute(&state.db)
    .await?;

    state.mailer.send(
        &correo,
        "Confirma tu correo en Time2Go",
        &format!("Valida tu cuenta: /validate-email?token={raw_token}"),
    );

    Ok((StatusCode::CREATED, Json(json!({ "ok": true }))).into_response())
}

#[derive(Deserialize)]
struct ValidateEmailParams {
    token: String,
}

async fn validate_email(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ValidateEmailParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token_hash = digest(&params.token);
    let row = sqlx::query(
        "SELECT usuario_id, expires_at, used FROM tokens_validacion WHERE token_hash = $1",
    )
    .bind(&token_hash)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("token"))?;

    let used: bool = row.get("used");
    let expires_at: OffsetDateTime = row.get("expires_at");
    if used || expires_at < OffsetDateTime::now_utc() {
        return Err(ApiError::Validation("token caducado o ya usado".into()));
    }
    let user_id: Uuid = row.get("usuario_id");

    sqlx::query("UPDATE tokens_validacion SET used = true WHERE token_hash = $1")
        .bind(&token_hash)
        .execute(&state.db)
        .await?;
    users::mark_verified(&state.db, user_id).await?;

    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
struct LoginPayload {
    correo: String,
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, ApiError> {
    if !validate_correo(&payload.correo) {
        return Err(ApiError::Validation("correo inválido".into()));
    }

    // Absent account, missing hash and bad password all collapse to the same
    // generic signal; banned and unverified surface their own reasons.
    let user = users::find_by_correo(&state.db, payload.correo.trim())
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    if !user.activo {
        return Err(ApiError::Banned);
    }
    if !user.verificado {
        return Err(ApiError::Unverified);
    }
    let hash = user
        .hash
        .as_deref()
        .filter(|h| !h.is_empty())
        .ok_or(ApiError::InvalidCredentials)?;
    let valid = password::verify_password(&payload.password, hash)
        .map_err(|_| ApiError::InvalidCredentials)?;
    if !valid {
        return Err(ApiError::InvalidCredentials);
    }

    session_response(&state, &user.id.to_string(), &user.display_name())
}

#[derive(Deserialize)]
struct GoogleLoginPayload {
    id_token: String,
}

async fn login_google(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GoogleLoginPayload>,
) -> Result<Response, ApiError> {
    let identity = state.google.verify(&payload.id_token).await?;

    // Subject id first, then email, so password accounts can adopt Google.
    let existing = match users::find_by_google_sub(&state.db, &identity.sub).await? {
        Some(user) => Some(user),
        None => users::find_by_correo(&state.db, &identity.email).await?,
    };

    let user = match existing {
        Some(user) => {
            if !user.activo {
                return Err(ApiError::Banned);
            }
            users::adopt_google(&state.db, user.id, &identity).await?;
            users::load_active(&state.db, user.id).await?
        }
        None => {
            let id = users::insert_google(&state.db, &identity).await?;
            users::load_active(&state.db, id).await?
        }
    };

    session_response(&state, &user.id.to_string(), &user.display_name())
}

async fn logout(State(state): State<Arc<AppState>>) -> Response {
    let cookie = clear_session_cookie(&state.security);
    ([(SET_COOKIE, cookie)], Json(json!({ "ok": true }))).into_response()
}

#[derive(Deserialize)]
struct ResetPayload {
    correo: String,
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Same answer whether or not the account exists.
    if let Some(user) = users::find_by_correo(&state.db, payload.correo.trim()).await? {
        if user.activo {
            let new_password = password::generate_random(RESET_PASSWORD_LEN);
            let hash = password::hash_password(&new_password).map_err(|_| ApiError::Internal)?;
            users::set_password(&state.db, user.id, &hash).await?;
            state.mailer.send(
                &user.correo,
                "Tu nueva contraseña de Time2Go",
                &format!("Tu nueva contraseña es: {new_password}"),
            );
        }
    }
    Ok(Json(json!({ "ok": true })))
}

fn session_response(state: &AppState, subject: &str, name: &str) -> Result<Response, ApiError> {
    let token = state
        .jwt
        .issue(subject, name)
        .map_err(|_| ApiError::Internal)?;
    let cookie = session_cookie(&state.security, &token, state.jwt.ttl());
    let body = Json(json!({ "ok": true, "token": token, "nombre": name }));
    Ok(([(SET_COOKIE, cookie)], body).into_response())
}

fn session_cookie(cfg: &SecurityConfig, token: &str, max_age: Duration) -> String {
    let mut builder = Cookie::build((cfg.cookie_name.clone(), token.to_string()))
        .http_only(true)
        .secure(cfg.secure_cookies)
        .same_site(cfg.same_site)
        .max_age(max_age)
        .path("/");
    if let Some(domain) = &cfg.cookie_domain {
        builder = builder.domain(domain.clone());
    }
    builder.build().to_string()
}

fn clear_session_cookie(cfg: &SecurityConfig) -> String {
    session_cookie(cfg, "", Duration::seconds(0))
}

fn one_time_token() -> (String, String) {
    let raw = format!("{}-{}", Uuid::new_v4(), Uuid::new_v4());
    let hash = digest(&raw);
    (raw, hash)
}

fn digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cookie::SameSite;

    fn config() -> SecurityConfig {
        SecurityConfig {
            cookie_name: "token".into(),
            secure_cookies: true,
            same_site: SameSite::Lax,
            cookie_domain: None,
        }
    }

    #[test]
    fn correo_and_password_validators() {
        assert!(validate_correo("a@x.com"));
        assert!(!validate_correo("not-an-email"));
        assert!(validate_password("12345678"));
        assert!(!validate_password("short"));
    }

    #[test]
    fn session_cookie_carries_the_agreed_attributes() {
        let cookie = session_cookie(&config(), "abc", Duration::minutes(30));
        assert!(cookie.starts_with("token=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=1800"));
    }

    #[test]
    fn domain_attribute_is_optional() {
        let mut cfg = config();
        assert!(!session_cookie(&cfg, "abc", Duration::minutes(30)).contains("Domain"));
        cfg.cookie_domain = Some("time2go.app".into());
        assert!(session_cookie(&cfg, "abc", Duration::minutes(30)).contains("Domain=time2go.app"));
    }

    #[test]
    fn clearing_the_cookie_expires_it_immediately() {
        let cookie = clear_session_cookie(&config());
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn one_time_tokens_store_only_a_digest() {
        let (raw, hash) = one_time_token();
        assert_ne!(raw, hash);
        assert_eq!(hash, digest(&raw));
        assert_eq!(hash.len(), 64);
    }
}
