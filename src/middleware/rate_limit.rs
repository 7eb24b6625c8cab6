use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::time::{Duration, Instant};

const MAX_ATTEMPTS: u32 = 20;
const WINDOW_SECS: u64 = 60;

struct Bucket {
    count: u32,
    window_start: Instant,
}

static BUCKETS: Lazy<DashMap<String, Bucket>> = Lazy::new(DashMap::new);

/// Fixed-window limiter for the credential endpoints (login, register,
/// reset). Keyed by client IP and path.
pub async fn credential_guard(
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let ip = client_ip(req.headers()).unwrap_or_else(|| "unknown".into());
    let key = format!("{}:{}", ip, req.uri().path());

    let mut entry = BUCKETS.entry(key).or_insert_with(|| Bucket {
        count: 0,
        window_start: Instant::now(),
    });

    if entry.window_start.elapsed() > Duration::from_secs(WINDOW_SECS) {
        entry.count = 0;
        entry.window_start = Instant::now();
    }

    if entry.count >= MAX_ATTEMPTS {
        return Err((StatusCode::TOO_MANY_REQUESTS, "rate_limited".into()));
    }

    entry.count += 1;
    drop(entry);

    Ok(next.run(req).await)
}

pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ip_takes_the_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.5, 10.0.0.1".parse().expect("header"),
        );
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.5"));
    }

    #[test]
    fn missing_forwarded_header_is_none() {
        assert!(client_ip(&HeaderMap::new()).is_none());
    }
}
