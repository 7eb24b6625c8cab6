use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::security::session;
use crate::state::AppState;

/// Identity resolved by the session middleware, available to every handler.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
}

/// Applied to the whole router: resolves bearer-then-cookie once, so no route
/// can drift to its own precedence. Anonymous requests pass through; routes
/// that need an identity use the `CurrentUser` extractor.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(claims) = session::resolve(req.headers(), &state.jwt, &state.security.cookie_name) {
        if let Ok(id) = Uuid::parse_str(&claims.sub) {
            req.extensions_mut().insert(CurrentUser {
                id,
                name: claims.name,
            });
        }
    }
    next.run(req).await
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

impl<S> OptionalFromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned())
    }
}
