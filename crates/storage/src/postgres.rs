//! PostgreSQL-backed product/dataset index.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::IndexBackend;
use crate::error::{IndexError, IndexResult};

/// Database connection pool and index operations.
#[derive(Debug, Clone)]
pub struct PgIndex {
    pool: PgPool,
}

impl PgIndex {
    /// Connect from a database URL.
    pub async fn connect(database_url: &str) -> IndexResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| IndexError::DatabaseError(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Connect from explicit connection options.
    pub async fn connect_with(options: PgConnectOptions) -> IndexResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| IndexError::DatabaseError(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> IndexResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| IndexError::DatabaseError(format!("Ping failed: {}", e)))?;
        Ok(())
    }

    /// Create the index tables if they do not exist.
    pub async fn migrate(&self) -> IndexResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| IndexError::DatabaseError(format!("Migration failed: {}", e)))?;
            }
        }

        info!("Index schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl IndexBackend for PgIndex {
    async fn list_product_names(&self) -> IndexResult<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT name FROM products ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IndexError::DatabaseError(format!("Query failed: {}", e)))
    }

    async fn product_exists(&self, name: &str) -> IndexResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IndexError::DatabaseError(format!("Query failed: {}", e)))
    }

    async fn add_product(&self, name: &str, definition: &Value) -> IndexResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IndexError::DatabaseError(format!("Transaction failed: {}", e)))?;

        sqlx::query("INSERT INTO products (name, definition) VALUES ($1, $2)")
            .bind(name)
            .bind(Json(definition))
            .execute(&mut *tx)
            .await
            .map_err(|e| IndexError::from_sqlx("Insert product failed", e))?;

        tx.commit()
            .await
            .map_err(|e| IndexError::DatabaseError(format!("Commit failed: {}", e)))?;

        debug!(product = %name, "Inserted product");
        Ok(())
    }

    async fn dataset_exists(&self, id: Uuid) -> IndexResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM datasets WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IndexError::DatabaseError(format!("Query failed: {}", e)))
    }

    async fn add_dataset(
        &self,
        id: Uuid,
        product_name: &str,
        document: &Value,
        source_uri: &str,
    ) -> IndexResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IndexError::DatabaseError(format!("Transaction failed: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO datasets (id, product_name, metadata, uri)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(product_name)
        .bind(Json(document))
        .bind(source_uri)
        .execute(&mut *tx)
        .await
        .map_err(|e| IndexError::from_sqlx("Insert dataset failed", e))?;

        tx.commit()
            .await
            .map_err(|e| IndexError::DatabaseError(format!("Commit failed: {}", e)))?;

        debug!(dataset_id = %id, product = %product_name, "Inserted dataset");
        Ok(())
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    name VARCHAR(200) PRIMARY KEY,
    definition JSONB NOT NULL,
    added_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS datasets (
    id UUID PRIMARY KEY,
    product_name VARCHAR(200) NOT NULL REFERENCES products(name),
    metadata JSONB NOT NULL,
    uri TEXT NOT NULL,
    added_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_datasets_product ON datasets(product_name);
"#;
