use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::error::ApiError;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Verifies Google ID tokens against the tokeninfo endpoint.
#[derive(Clone)]
pub struct GoogleAuth {
    client_id: Option<String>,
    http: Client,
}

/// What tokeninfo reports about an ID token. `email_verified` arrives as the
/// strings "true"/"false".
#[derive(Debug, Deserialize)]
pub struct TokenInfo {
    pub aud: String,
    pub sub: String,
    pub email: String,
    pub email_verified: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

/// A Google identity this application accepts.
#[derive(Debug, Clone)]
pub struct GoogleIdentity {
    pub sub: String,
    pub email: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

impl GoogleAuth {
    pub fn from_env() -> anyhow::Result<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if client_id.is_none() {
            warn!("GOOGLE_CLIENT_ID not set; Google sign-in will be unavailable");
        }
        let http = Client::builder().user_agent("time2go-api").build()?;
        Ok(Self { client_id, http })
    }

    pub async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, ApiError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| ApiError::Upstream("google sign-in not configured".into()))?;

        let res = self
            .http
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("google tokeninfo unreachable: {e}")))?;

        if !res.status().is_success() {
            // Google rejected the token itself.
            return Err(ApiError::InvalidCredentials);
        }

        let info: TokenInfo = res
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("google tokeninfo malformed: {e}")))?;

        accept(info, client_id)
    }
}

/// Audience must be this application and Google must have attested the email.
fn accept(info: TokenInfo, client_id: &str) -> Result<GoogleIdentity, ApiError> {
    if info.aud != client_id {
        return Err(ApiError::InvalidCredentials);
    }
    if info.email_verified.as_deref() != Some("true") {
        return Err(ApiError::InvalidCredentials);
    }
    Ok(GoogleIdentity {
        sub: info.sub,
        email: info.email,
        given_name: info.given_name,
        family_name: info.family_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, verified: Option<&str>) -> TokenInfo {
        TokenInfo {
            aud: aud.into(),
            sub: "108234".into(),
            email: "ana@example.com".into(),
            email_verified: verified.map(|s| s.to_string()),
            given_name: Some("Ana".into()),
            family_name: Some("Pérez".into()),
        }
    }

    #[test]
    fn matching_audience_and_verified_email_are_accepted() {
        let id = accept(info("client-1", Some("true")), "client-1").expect("accepted");
        assert_eq!(id.sub, "108234");
        assert_eq!(id.email, "ana@example.com");
    }

    #[test]
    fn foreign_audience_is_rejected() {
        assert!(matches!(
            accept(info("someone-else", Some("true")), "client-1"),
            Err(ApiError::InvalidCredentials)
        ));
    }

    #[test]
    fn unverified_or_unattested_email_is_rejected() {
        assert!(accept(info("client-1", Some("false")), "client-1").is_err());
        assert!(accept(info("client-1", None), "client-1").is_err());
    }
}
