use std::sync::Arc;

use crate::infra::db::Db;
use crate::infra::mailer::Mailer;
use crate::security::config::SecurityConfig;
use crate::security::google::GoogleAuth;
use crate::security::jwt::JwtManager;

/// Shared services, constructed once in `main` and never mutated.
pub struct AppState {
    pub db: Db,
    pub jwt: JwtManager,
    pub security: SecurityConfig,
    pub google: GoogleAuth,
    pub mailer: Mailer,
}

impl AppState {
    pub fn new(
        db: Db,
        jwt: JwtManager,
        security: SecurityConfig,
        google: GoogleAuth,
        mailer: Mailer,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            jwt,
            security,
            google,
            mailer,
        })
    }
}
