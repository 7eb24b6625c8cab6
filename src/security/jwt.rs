use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

/// Session token payload: subject id, display name, issue/expiry instants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct JwtManager {
    secret: String,
    ttl: Duration,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token error: {0}")]
    Token(String),
}

const DEFAULT_TTL_MINUTES: i64 = 30;

impl JwtManager {
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
        let ttl_minutes = std::env::var("SESSION_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TTL_MINUTES);
        Self::new(secret, Duration::minutes(ttl_minutes))
    }

    pub fn new(secret: String, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject: &str, name: &str) -> Result<String, JwtError> {
        self.issue_with_ttl(subject, name, self.ttl)
    }

    pub fn issue_with_ttl(
        &self,
        subject: &str,
        name: &str,
        ttl: Duration,
    ) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: subject.to_string(),
            name: name.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| JwtError::Token(e.to_string()))
    }

    /// Signature, payload shape and expiry are all checked; any failure is `None`.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .ok()
        .map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret".into(), Duration::minutes(30))
    }

    #[test]
    fn issued_token_verifies_and_round_trips_claims() {
        let jwt = manager();
        let token = jwt.issue("user-42", "Ana Pérez").expect("issue");
        let claims = jwt.verify(&token).expect("token should verify");
        assert_eq!(claims.sub, "user-42");
        assert_eq!(claims.name, "Ana Pérez");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = manager();
        // well past the validator's default leeway
        let token = jwt
            .issue_with_ttl("user-42", "Ana", Duration::minutes(-5))
            .expect("issue");
        assert!(jwt.verify(&token).is_none());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = manager().issue("user-42", "Ana").expect("issue");
        let other = JwtManager::new("another-secret".into(), Duration::minutes(30));
        assert!(other.verify(&token).is_none());
    }

    #[test]
    fn garbage_is_rejected_without_panicking() {
        let jwt = manager();
        assert!(jwt.verify("").is_none());
        assert!(jwt.verify("not.a.token").is_none());
        assert!(jwt.verify("eyJhbGciOiJIUzI1NiJ9.e30.sig").is_none());
    }
}
