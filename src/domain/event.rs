use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Listing/detail row for an event. `estado = false` means awaiting approval
/// and invisible to the public.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub categoria_id: i32,
    pub municipio_id: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub fecha_inicio: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub fecha_fin: Option<OffsetDateTime>,
    pub imagen: Option<String>,
    pub estado: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Rating {
    pub usuario: String,
    pub puntuacion: i16,
    pub comentario: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
