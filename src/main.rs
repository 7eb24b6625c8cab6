mod domain;
mod error;
mod infra;
mod middleware;
mod routes;
mod security;
mod state;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use infra::db::connect;
use infra::mailer::Mailer;
use security::config::SecurityConfig;
use security::google::GoogleAuth;
use security::jwt::JwtManager;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = connect().await?;
    let jwt = JwtManager::from_env();
    let security = SecurityConfig::from_env();
    let google = GoogleAuth::from_env()?;
    let mailer = Mailer::from_env();
    let shared_state = state::AppState::new(db, jwt, security, google, mailer);

    let app = Router::new()
        .merge(routes::router())
        .route("/health", get(|| async { "OK" }))
        .layer(from_fn_with_state(
            shared_state.clone(),
            middleware::auth::session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
