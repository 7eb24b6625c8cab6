use axum::{middleware::from_fn, Router};
use std::sync::Arc;

use crate::middleware::rate_limit;
use crate::state::AppState;

mod account;
mod admin;
mod auth;
mod catalog;
mod events;
mod permissions;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth::router().route_layer(from_fn(rate_limit::credential_guard)))
        .merge(account::router())
        .merge(permissions::router())
        .merge(events::router())
        .merge(catalog::router())
        .merge(admin::router())
}
