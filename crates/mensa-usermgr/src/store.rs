//! Account store.
//!
//! The credential backing for token issuance: usernames, bcrypt password
//! hashes, roles and activity flags in sqlite.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{debug, instrument};

use mensa_auth::Role;

/// Account entity from the database.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_active: bool,
    pub created_at: String,
    pub last_login_at: Option<String>,
}

/// Repository for account database operations.
#[derive(Debug, Clone)]
pub struct AccountStore {
    pool: SqlitePool,
}

impl AccountStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) a sqlite database at `path`.
    pub async fn open(path: &std::path::Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to open account database")?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory store for tests.
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
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'USER',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                last_login_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create accounts table")?;
        Ok(())
    }

    /// Create an account. The password must already be hashed.
    #[instrument(skip(self, password_hash))]
    pub async fn create(&self, username: &str, password_hash: &str, role: Role) -> Result<Account> {
        debug!("creating account");
        sqlx::query(
            r#"
            INSERT INTO accounts (username, password_hash, role)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to insert account")?;

        self.find_by_username(username)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Account not found after creation"))
    }

    #[instrument(skip(self))]
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, password_hash, role, is_active, created_at, last_login_at
            FROM accounts
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query account")?;
        Ok(account)
    }

    #[instrument(skip(self))]
    pub async fn update_last_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE accounts SET last_login_at = datetime('now') WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update last login")?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_active(&self, id: i64, is_active: bool) -> Result<()> {
        sqlx::query("UPDATE accounts SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update account status")?;
        Ok(())
    }

    /// Username availability check used by registration.
    pub async fn is_username_available(&self, username: &str) -> Result<bool> {
        Ok(self.find_by_username(username).await?.is_none())
    }

    /// Create the bootstrap admin account unless it already exists. Run at
    /// startup when the config carries bootstrap credentials.
    pub async fn ensure_admin(&self, username: &str, password_hash: &str) -> Result<()> {
        if self.find_by_username(username).await?.is_some() {
            return Ok(());
        }
        self.create(username, password_hash, Role::Admin).await?;
        debug!(username, "bootstrap admin created");
        Ok(())
    }
}
