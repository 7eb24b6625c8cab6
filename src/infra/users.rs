//! User store: every query touching `usuarios` lives here so login, OAuth
//! federation and registration share one row mapping and one conflict shape.

use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::user::{User, DEFAULT_ROLE};
use crate::error::ApiError;
use crate::infra::db::Db;
use crate::security::google::GoogleIdentity;

const USER_COLUMNS: &str = "id, documento, nombre, apellidos, correo, telefono, hash, google_id, \
                            rol_id, activo, verificado, created_at, updated_at";

pub struct NewUser {
    pub documento: Option<String>,
    pub nombre: String,
    pub apellidos: String,
    pub correo: String,
    pub telefono: String,
    pub hash: String,
}

fn map_user(row: PgRow) -> User {
    User {
        id: row.get("id"),
        documento: row.get("documento"),
        nombre: row.get("nombre"),
        apellidos: row.get("apellidos"),
        correo: row.get("correo"),
        telefono: row.get("telefono"),
        hash: row.get("hash"),
        google_id: row.get("google_id"),
        rol_id: row.get("rol_id"),
        activo: row.get("activo"),
        verificado: row.get("verificado"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub async fn find_by_correo(db: &Db, correo: &str) -> Result<Option<User>, ApiError> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM usuarios WHERE correo = $1"))
        .bind(correo)
        .fetch_optional(db)
        .await?;
    Ok(row.map(map_user))
}

pub async fn find_by_google_sub(db: &Db, sub: &str) -> Result<Option<User>, ApiError> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM usuarios WHERE google_id = $1"))
        .bind(sub)
        .fetch_optional(db)
        .await?;
    Ok(row.map(map_user))
}

/// Load the account behind a verified session token. A token whose subject no
/// longer resolves is treated as unauthenticated; a banned account is refused
/// outright.
pub async fn load_active(db: &Db, id: Uuid) -> Result<User, ApiError> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM usuarios WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?;
    let user = row.map(map_user).ok_or(ApiError::Unauthorized)?;
    if !user.activo {
        return Err(ApiError::Banned);
    }
    Ok(user)
}

/// Which of correo/telefono/documento already belong to another account,
/// reported in a stable order. The unique constraints behind these columns
/// remain the backstop for races (`ApiError::from(sqlx::Error)`).
pub async fn duplicate_fields(
    db: &Db,
    correo: &str,
    telefono: &str,
    documento: Option<&str>,
) -> Result<Vec<&'static str>, ApiError> {
    let rows = sqlx::query(
        "SELECT correo, telefono, documento FROM usuarios
         WHERE correo = $1 OR telefono = $2 OR ($3::text IS NOT NULL AND documento = $3)",
    )
    .bind(correo)
    .bind(telefono)
    .bind(documento)
    .fetch_all(db)
    .await?;

    let mut duplicates = Vec::new();
    for row in &rows {
        let existing_correo: String = row.get("correo");
        let existing_telefono: Option<String> = row.get("telefono");
        let existing_documento: Option<String> = row.get("documento");
        if existing_correo == correo && !duplicates.contains(&"correo") {
            duplicates.push("correo");
        }
        if existing_telefono.as_deref() == Some(telefono) && !duplicates.contains(&"telefono") {
            duplicates.push("telefono");
        }
        if documento.is_some()
            && existing_documento.as_deref() == documento
            && !duplicates.contains(&"documento")
        {
            duplicates.push("documento");
        }
    }
    duplicates.sort_by_key(|f| match *f {
        "correo" => 0,
        "telefono" => 1,
        _ => 2,
    });
    Ok(duplicates)
}

pub async fn insert_local(db: &Db, new: &NewUser) -> Result<Uuid, ApiError> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO usuarios (id, documento, nombre, apellidos, correo, telefono, hash, \
         rol_id, activo, verificado, terminos, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, false, true, now(), now())",
    )
    .bind(id)
    .bind(&new.documento)
    .bind(&new.nombre)
    .bind(&new.apellidos)
    .bind(&new.correo)
    .bind(&new.telefono)
    .bind(&new.hash)
    .bind(DEFAULT_ROLE)
    .execute(db)
    .await?;
    Ok(id)
}

/// Link a Google identity to an existing account: only null columns are
/// filled, the email becomes verified, nothing already set is overwritten.
pub async fn adopt_google(db: &Db, user_id: Uuid, identity: &GoogleIdentity) -> Result<(), ApiError> {
    sqlx::query(
        "UPDATE usuarios SET google_id = COALESCE(google_id, $1), \
         nombre = COALESCE(nombre, $2), apellidos = COALESCE(apellidos, $3), \
         verificado = true, updated_at = now() WHERE id = $4",
    )
    .bind(&identity.sub)
    .bind(&identity.given_name)
    .bind(&identity.family_name)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}

/// First Google login with no matching account: pre-verified, terms accepted,
/// default role, no password hash.
pub async fn insert_google(db: &Db, identity: &GoogleIdentity) -> Result<Uuid, ApiError> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO usuarios (id, nombre, apellidos, correo, google_id, rol_id, \
         activo, verificado, terminos, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, true, true, true, now(), now())",
    )
    .bind(id)
    .bind(&identity.given_name)
    .bind(&identity.family_name)
    .bind(&identity.email)
    .bind(&identity.sub)
    .bind(DEFAULT_ROLE)
    .execute(db)
    .await?;
    Ok(id)
}

pub async fn set_password(db: &Db, user_id: Uuid, hash: &str) -> Result<(), ApiError> {
    sqlx::query("UPDATE usuarios SET hash = $1, updated_at = now() WHERE id = $2")
        .bind(hash)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn mark_verified(db: &Db, user_id: Uuid) -> Result<(), ApiError> {
    sqlx::query("UPDATE usuarios SET verificado = true, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}
