use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_ROLE: i32 = 1;
pub const ADMIN_ROLE: i32 = 4;

/// Account row as stored. `hash` is null for OAuth-only accounts; `activo =
/// false` means banned. Never serialized with the hash or the Google subject.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub documento: Option<String>,
    pub nombre: Option<String>,
    pub apellidos: Option<String>,
    pub correo: String,
    pub telefono: Option<String>,
    #[serde(skip)]
    pub hash: Option<String>,
    #[serde(skip)]
    pub google_id: Option<String>,
    pub rol_id: i32,
    pub activo: bool,
    pub verificado: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn display_name(&self) -> String {
        match (self.nombre.as_deref(), self.apellidos.as_deref()) {
            (Some(n), Some(a)) => format!("{n} {a}"),
            (Some(n), None) => n.to_string(),
            _ => self.correo.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(nombre: Option<&str>, apellidos: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            documento: None,
            nombre: nombre.map(String::from),
            apellidos: apellidos.map(String::from),
            correo: "ana@example.com".into(),
            telefono: None,
            hash: None,
            google_id: None,
            rol_id: DEFAULT_ROLE,
            activo: true,
            verificado: true,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn display_name_prefers_full_name_then_email() {
        assert_eq!(user(Some("Ana"), Some("Pérez")).display_name(), "Ana Pérez");
        assert_eq!(user(Some("Ana"), None).display_name(), "Ana");
        assert_eq!(user(None, None).display_name(), "ana@example.com");
    }

    #[test]
    fn serialized_user_never_exposes_secrets() {
        let mut u = user(Some("Ana"), None);
        u.hash = Some("$argon2id$...".into());
        u.google_id = Some("108234".into());
        let json = serde_json::to_value(&u).expect("serialize");
        assert!(json.get("hash").is_none());
        assert!(json.get("google_id").is_none());
        assert_eq!(json["correo"], "ana@example.com");
    }
}
