//! User accounts keyed by unique email.
//!
//! Backed by a single SQLite `users` table through `sqlx`. Accounts are
//! created and read, never updated or deleted. Password hashing runs on the
//! blocking pool since Argon2 is deliberately slow.

pub mod password;

use std::str::FromStr;

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::DatabaseConfig;
use crate::error::AccountError;

const CREATE_USERS_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

/// A stored user record.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserAccount {
    /// System-assigned identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Unique login email
    pub email: String,
    /// Argon2 PHC string, never the raw password
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Creation time (UTC, `YYYY-MM-DD HH:MM:SS`)
    pub created_at: String,
}

/// The user table.
#[derive(Debug, Clone)]
pub struct AccountStore {
    pool: SqlitePool,
}

impl AccountStore {
    /// Connect to the configured database and ensure the schema exists.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AccountError> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        tracing::info!("Connected to account database");
        Self::with_pool(pool).await
    }

    /// Open a private in-memory database.
    ///
    /// A single long-lived connection keeps the database alive for the
    /// lifetime of the store.
    pub async fn in_memory() -> Result<Self, AccountError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, AccountError> {
        sqlx::query(CREATE_USERS_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Create an account, failing with `DuplicateEmail` if the email is taken.
    pub async fn create_account(
        &self,
        name: &str,
        email: &str,
        raw_password: &str,
    ) -> Result<UserAccount, AccountError> {
        if self.find_by_email(email).await?.is_some() {
            return Err(AccountError::DuplicateEmail);
        }

        let raw = raw_password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&raw))
            .await
            .map_err(|e| AccountError::Hash(format!("Task join error: {e}")))??;

        let account = sqlx::query_as::<_, UserAccount>(
            "INSERT INTO users (name, email, password_hash) VALUES (?, ?, ?) \
             RETURNING id, name, email, password_hash, created_at",
        )
        .bind(name)
        .bind(email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Lost a race with a concurrent signup for the same email
            let duplicate =
                matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
            if duplicate {
                AccountError::DuplicateEmail
            } else {
                AccountError::Database(e)
            }
        })?;

        tracing::info!(user_id = account.id, "Created account");
        Ok(account)
    }

    /// Look up an account by exact email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, AccountError> {
        let account = sqlx::query_as::<_, UserAccount>(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    /// Check an email/password pair.
    ///
    /// Unknown emails and wrong passwords both yield `InvalidCredentials`.
    pub async fn verify_credentials(
        &self,
        email: &str,
        raw_password: &str,
    ) -> Result<UserAccount, AccountError> {
        let account = self
            .find_by_email(email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        let raw = raw_password.to_string();
        let stored = account.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || password::verify_password(&raw, &stored))
            .await
            .map_err(|e| AccountError::Hash(format!("Task join error: {e}")))??;

        if matches {
            Ok(account)
        } else {
            Err(AccountError::InvalidCredentials)
        }
    }

    /// Number of stored accounts.
    pub async fn count(&self) -> Result<i64, AccountError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let store = AccountStore::in_memory().await.unwrap();
        let created = store
            .create_account("Ada", "ada@example.com", "analytical")
            .await
            .unwrap();
        assert_eq!(created.name, "Ada");
        assert!(!created.created_at.is_empty());

        let found = store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(store.find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = AccountStore::in_memory().await.unwrap();
        store.create_account("A", "dup@example.com", "one").await.unwrap();
        let err = store
            .create_account("B", "dup@example.com", "two")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::DuplicateEmail));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let store = AccountStore::in_memory().await.unwrap();
        store.create_account("Grace", "grace@example.com", "cobol").await.unwrap();

        let account = store.verify_credentials("grace@example.com", "cobol").await.unwrap();
        assert_eq!(account.email, "grace@example.com");

        let wrong = store.verify_credentials("grace@example.com", "fortran").await;
        assert!(matches!(wrong, Err(AccountError::InvalidCredentials)));

        let unknown = store.verify_credentials("nobody@example.com", "cobol").await;
        assert!(matches!(unknown, Err(AccountError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_password_never_stored_raw() {
        let store = AccountStore::in_memory().await.unwrap();
        let account = store
            .create_account("Lin", "lin@example.com", "plain-secret")
            .await
            .unwrap();
        assert_ne!(account.password_hash, "plain-secret");
        assert!(!account.password_hash.contains("plain-secret"));
    }

    #[tokio::test]
    async fn test_serialized_account_omits_hash() {
        let store = AccountStore::in_memory().await.unwrap();
        let account = store.create_account("Kay", "kay@example.com", "pw").await.unwrap();
        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "kay@example.com");
    }

    #[tokio::test]
    async fn test_connect_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("users.db").display()),
            max_connections: 2,
        };
        let store = AccountStore::connect(&config).await.unwrap();
        store.create_account("Max", "max@example.com", "pw").await.unwrap();
        drop(store);

        let reopened = AccountStore::connect(&config).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }
}
