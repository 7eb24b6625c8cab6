use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Unique constraints backing the duplicate pre-checks. If a concurrent
/// insert slips past the pre-check, the database reports one of these and we
/// translate it to the same conflict shape the pre-check would have produced.
const UNIQUE_CONSTRAINTS: &[(&str, &str)] = &[
    ("usuarios_correo_key", "correo"),
    ("usuarios_telefono_key", "telefono"),
    ("usuarios_documento_key", "documento"),
    ("usuarios_google_id_key", "google_id"),
];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email not verified")]
    Unverified,
    #[error("account banned")]
    Banned,
    #[error("insufficient permissions")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("duplicate fields")]
    Conflict(Vec<&'static str>),
    #[error("{0}")]
    Upstream(String),
    #[error("internal error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::InvalidCredentials | ApiError::Unverified => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Banned | ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // The client UI branches on `reason`, so banned/unverified/bad
        // credentials stay distinguishable even though they share a status.
        let mut body = json!({ "error": self.to_string() });
        match &self {
            ApiError::InvalidCredentials => body["reason"] = json!("invalid_credentials"),
            ApiError::Unverified => body["reason"] = json!("email_unverified"),
            ApiError::Banned => body["reason"] = json!("banned"),
            ApiError::Conflict(fields) => body["duplicates"] = json!(fields),
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(constraint) = db_err.constraint() {
                if let Some(field) = UNIQUE_CONSTRAINTS
                    .iter()
                    .find(|(name, _)| *name == constraint)
                    .map(|(_, field)| *field)
                {
                    return ApiError::Conflict(vec![field]);
                }
            }
        }
        error!("database error: {err}");
        ApiError::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn conflict_names_the_colliding_fields() {
        let (status, body) = body_json(ApiError::Conflict(vec!["correo"])).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["duplicates"], json!(["correo"]));
    }

    #[tokio::test]
    async fn banned_and_unverified_carry_distinct_reasons() {
        let (status, body) = body_json(ApiError::Banned).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["reason"], "banned");

        let (status, body) = body_json(ApiError::Unverified).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["reason"], "email_unverified");
    }

    #[tokio::test]
    async fn invalid_credentials_stay_generic() {
        let (status, body) = body_json(ApiError::InvalidCredentials).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["reason"], "invalid_credentials");
        assert_eq!(body["error"], "invalid credentials");
    }

    #[tokio::test]
    async fn statuses_follow_the_error_class() {
        assert_eq!(
            body_json(ApiError::Validation("bad".into())).await.0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(body_json(ApiError::Unauthorized).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(ApiError::Forbidden).await.0, StatusCode::FORBIDDEN);
        assert_eq!(body_json(ApiError::NotFound("event")).await.0, StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(ApiError::Upstream("down".into())).await.0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(body_json(ApiError::Internal).await.0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
