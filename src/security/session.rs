use axum::http::{header, HeaderMap};
use cookie::Cookie;

use crate::security::jwt::{Claims, JwtManager};

/// Resolve the caller's identity from a request's headers.
///
/// Precedence: `Authorization: Bearer <token>`, then the session cookie.
/// The first token that verifies wins; if neither does, the caller is
/// anonymous and the route decides whether that is a 401. Every protected
/// route goes through this one function.
pub fn resolve(headers: &HeaderMap, jwt: &JwtManager, cookie_name: &str) -> Option<Claims> {
    if let Some(token) = bearer_token(headers) {
        if let Some(claims) = jwt.verify(&token) {
            return Some(claims);
        }
    }
    if let Some(token) = cookie_token(headers, cookie_name) {
        if let Some(claims) = jwt.verify(&token) {
            return Some(claims);
        }
    }
    None
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

fn cookie_token(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        if let Ok(parsed) = Cookie::parse(part.trim().to_string()) {
            if parsed.name() == name {
                return Some(parsed.value().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    const COOKIE_NAME: &str = "token";

    fn jwt() -> JwtManager {
        JwtManager::new("resolver-secret".into(), Duration::minutes(30))
    }

    fn headers(bearer: Option<&str>, cookie: Option<&str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(token) = bearer {
            h.insert(
                header::AUTHORIZATION,
                format!("Bearer {token}").parse().expect("header"),
            );
        }
        if let Some(token) = cookie {
            h.insert(
                header::COOKIE,
                format!("other=1; {COOKIE_NAME}={token}").parse().expect("header"),
            );
        }
        h
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let jwt = jwt();
        let from_header = jwt.issue("header-user", "H").expect("issue");
        let from_cookie = jwt.issue("cookie-user", "C").expect("issue");
        let claims = resolve(&headers(Some(&from_header), Some(&from_cookie)), &jwt, COOKIE_NAME)
            .expect("resolved");
        assert_eq!(claims.sub, "header-user");
    }

    #[test]
    fn invalid_bearer_falls_back_to_cookie() {
        let jwt = jwt();
        let from_cookie = jwt.issue("cookie-user", "C").expect("issue");
        let claims = resolve(&headers(Some("bogus"), Some(&from_cookie)), &jwt, COOKIE_NAME)
            .expect("resolved");
        assert_eq!(claims.sub, "cookie-user");
    }

    #[test]
    fn no_verifiable_source_is_anonymous() {
        let jwt = jwt();
        assert!(resolve(&headers(None, None), &jwt, COOKIE_NAME).is_none());
        assert!(resolve(&headers(Some("bogus"), Some("bogus")), &jwt, COOKIE_NAME).is_none());
    }

    #[test]
    fn expired_cookie_token_is_anonymous() {
        let jwt = jwt();
        let stale = jwt
            .issue_with_ttl("cookie-user", "C", Duration::minutes(-5))
            .expect("issue");
        assert!(resolve(&headers(None, Some(&stale)), &jwt, COOKIE_NAME).is_none());
    }
}
