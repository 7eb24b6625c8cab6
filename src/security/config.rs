use cookie::SameSite;
use tracing::warn;

/// Cookie policy for the session token, read once at startup.
#[derive(Clone)]
pub struct SecurityConfig {
    pub cookie_name: String,
    pub secure_cookies: bool,
    pub same_site: SameSite,
    pub cookie_domain: Option<String>,
}

impl SecurityConfig {
    pub fn from_env() -> Self {
        let cookie_name = env_string("SESSION_COOKIE_NAME").unwrap_or_else(|| "token".into());
        let mut secure_cookies = env_bool("COOKIE_SECURE").unwrap_or(true);
        let same_site = env_same_site().unwrap_or(SameSite::Lax);
        let cookie_domain = env_string("COOKIE_DOMAIN");

        if same_site == SameSite::None && !secure_cookies {
            warn!("SameSite=None requires secure cookies; forcing COOKIE_SECURE=true");
            secure_cookies = true;
        }

        SecurityConfig {
            cookie_name,
            secure_cookies,
            same_site,
            cookie_domain,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|v| {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    })
}

fn env_same_site() -> Option<SameSite> {
    std::env::var("COOKIE_SAMESITE").ok().and_then(|v| {
        match v.trim().to_ascii_lowercase().as_str() {
            "none" => Some(SameSite::None),
            "lax" => Some(SameSite::Lax),
            "strict" => Some(SameSite::Strict),
            _ => None,
        }
    })
}
