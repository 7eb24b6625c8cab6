use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Country {
    pub id: i32,
    pub nombre: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Municipality {
    pub id: i32,
    pub nombre: String,
    pub pais_id: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i32,
    pub nombre: String,
}
