//! Catalog repository over sqlite.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::instrument;

use crate::models::{
    Cafeteria, CreateCafeteriaRequest, CreateStallRequest, Favorite, Stall,
    UpdateCafeteriaRequest,
};

#[derive(Debug, Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn open(path: &std::path::Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to open catalog database")?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cafeterias (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                location TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stalls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cafeteria_id INTEGER NOT NULL REFERENCES cafeterias(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                cuisine TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS favorites (
                user_id INTEGER NOT NULL,
                cafeteria_id INTEGER NOT NULL REFERENCES cafeterias(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, cafeteria_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create catalog schema")?;

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_cafeterias(&self) -> Result<Vec<Cafeteria>> {
        let rows = sqlx::query_as::<_, Cafeteria>(
            "SELECT id, name, location, description, created_at FROM cafeterias ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list cafeterias")?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn get_cafeteria(&self, id: i64) -> Result<Option<Cafeteria>> {
        let row = sqlx::query_as::<_, Cafeteria>(
            "SELECT id, name, location, description, created_at FROM cafeterias WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get cafeteria")?;
        Ok(row)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_cafeteria(&self, request: CreateCafeteriaRequest) -> Result<Cafeteria> {
        let result = sqlx::query(
            "INSERT INTO cafeterias (name, location, description) VALUES (?, ?, ?)",
        )
        .bind(&request.name)
        .bind(&request.location)
        .bind(&request.description)
        .execute(&self.pool)
        .await
        .context("Failed to insert cafeteria")?;

        self.get_cafeteria(result.last_insert_rowid())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Cafeteria not found after creation"))
    }

    #[instrument(skip(self, request))]
    pub async fn update_cafeteria(
        &self,
        id: i64,
        request: UpdateCafeteriaRequest,
    ) -> Result<Option<Cafeteria>> {
        let Some(existing) = self.get_cafeteria(id).await? else {
            return Ok(None);
        };

        sqlx::query("UPDATE cafeterias SET name = ?, location = ?, description = ? WHERE id = ?")
            .bind(request.name.unwrap_or(existing.name))
            .bind(request.location.unwrap_or(existing.location))
            .bind(request.description.or(existing.description))
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update cafeteria")?;

        self.get_cafeteria(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_cafeteria(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cafeterias WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete cafeteria")?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    pub async fn list_stalls(&self, cafeteria_id: i64) -> Result<Vec<Stall>> {
        let rows = sqlx::query_as::<_, Stall>(
            "SELECT id, cafeteria_id, name, cuisine FROM stalls WHERE cafeteria_id = ? ORDER BY name",
        )
        .bind(cafeteria_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list stalls")?;
        Ok(rows)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_stall(
        &self,
        cafeteria_id: i64,
        request: CreateStallRequest,
    ) -> Result<Stall> {
        let result =
            sqlx::query("INSERT INTO stalls (cafeteria_id, name, cuisine) VALUES (?, ?, ?)")
                .bind(cafeteria_id)
                .bind(&request.name)
                .bind(&request.cuisine)
                .execute(&self.pool)
                .await
                .context("Failed to insert stall")?;

        let row = sqlx::query_as::<_, Stall>(
            "SELECT id, cafeteria_id, name, cuisine FROM stalls WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .context("Stall not found after creation")?;
        Ok(row)
    }

    #[instrument(skip(self))]
    pub async fn list_favorites(&self, user_id: i64) -> Result<Vec<Favorite>> {
        let rows = sqlx::query_as::<_, Favorite>(
            "SELECT cafeteria_id, created_at FROM favorites WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list favorites")?;
        Ok(rows)
    }

    /// Idempotent: favoriting the same cafeteria twice is a no-op.
    #[instrument(skip(self))]
    pub async fn add_favorite(&self, user_id: i64, cafeteria_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO favorites (user_id, cafeteria_id) VALUES (?, ?)",
        )
        .bind(user_id)
        .bind(cafeteria_id)
        .execute(&self.pool)
        .await
        .context("Failed to insert favorite")?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_favorite(&self, user_id: i64, cafeteria_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND cafeteria_id = ?")
            .bind(user_id)
            .bind(cafeteria_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete favorite")?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_cafeteria(name: &str) -> CreateCafeteriaRequest {
        CreateCafeteriaRequest {
            name: name.to_string(),
            location: "Building A".to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_cafeteria_crud() {
        let store = CatalogStore::in_memory().await.unwrap();

        let created = store.create_cafeteria(new_cafeteria("North")).await.unwrap();
        assert_eq!(created.name, "North");

        let updated = store
            .update_cafeteria(
                created.id,
                UpdateCafeteriaRequest {
                    location: Some("Building B".to_string()),
                    ..UpdateCafeteriaRequest::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "North");
        assert_eq!(updated.location, "Building B");

        assert_eq!(store.list_cafeterias().await.unwrap().len(), 1);
        assert!(store.delete_cafeteria(created.id).await.unwrap());
        assert!(store.list_cafeterias().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stalls_scoped_to_cafeteria() {
        let store = CatalogStore::in_memory().await.unwrap();
        let north = store.create_cafeteria(new_cafeteria("North")).await.unwrap();
        let south = store.create_cafeteria(new_cafeteria("South")).await.unwrap();

        store
            .create_stall(
                north.id,
                CreateStallRequest {
                    name: "Noodle Bar".to_string(),
                    cuisine: Some("noodles".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(store.list_stalls(north.id).await.unwrap().len(), 1);
        assert!(store.list_stalls(south.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_favorites_are_per_user_and_idempotent() {
        let store = CatalogStore::in_memory().await.unwrap();
        let cafeteria = store.create_cafeteria(new_cafeteria("North")).await.unwrap();

        store.add_favorite(1, cafeteria.id).await.unwrap();
        store.add_favorite(1, cafeteria.id).await.unwrap();
        store.add_favorite(2, cafeteria.id).await.unwrap();

        assert_eq!(store.list_favorites(1).await.unwrap().len(), 1);
        assert_eq!(store.list_favorites(2).await.unwrap().len(), 1);

        assert!(store.remove_favorite(1, cafeteria.id).await.unwrap());
        assert!(store.list_favorites(1).await.unwrap().is_empty());
    }
}
