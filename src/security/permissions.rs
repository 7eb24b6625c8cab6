use crate::error::ApiError;
use crate::infra::db::Db;

/// Capabilities referenced by route handlers. Grants live in the `permisos`
/// table, so access changes are data edits, not deploys.
pub mod capability {
    pub const CREATE_EVENT: &str = "create_event";
    pub const APPROVE_EVENT: &str = "approve_event";
    pub const VIEW_DASHBOARD: &str = "view_dashboard";
    pub const MANAGE_USERS: &str = "manage_users";
}

/// Membership of (role, capability) in the grant table, read per request so
/// grant edits take effect on the next request.
pub async fn role_has(db: &Db, rol_id: i32, capability: &str) -> Result<bool, ApiError> {
    let allowed: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM permisos WHERE rol_id = $1 AND capacidad = $2)",
    )
    .bind(rol_id)
    .bind(capability)
    .fetch_one(db)
    .await?;
    Ok(allowed)
}

/// 403 when the role lacks the capability; authentication is the caller's
/// concern and is a 401 before this point.
pub async fn require(db: &Db, rol_id: i32, capability: &str) -> Result<(), ApiError> {
    if role_has(db, rol_id, capability).await? {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
