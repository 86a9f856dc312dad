//! Catalog data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A cafeteria as stored and served.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cafeteria {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub created_at: String,
}

/// A stall inside a cafeteria.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Stall {
    pub id: i64,
    pub cafeteria_id: i64,
    pub name: String,
    pub cuisine: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCafeteriaRequest {
    pub name: String,
    pub location: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateCafeteriaRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStallRequest {
    pub name: String,
    pub cuisine: Option<String>,
}

/// A favorite entry for the current principal.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Favorite {
    pub cafeteria_id: i64,
    pub created_at: String,
}
