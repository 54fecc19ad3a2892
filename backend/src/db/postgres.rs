use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    types::Json,
    PgPool, Row,
};
use tokio::sync::OnceCell;

use super::{Body, Collection, Document, DocumentStore, Filter, ObjectId, StoreError};

#[derive(Clone, Debug)]
pub struct DatabaseOptions {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

/// PostgreSQL-backed document store.
///
/// The pool is established on first use and cached for the life of the
/// value. Concurrent first callers wait on the same connection attempt; a
/// failed attempt leaves the cell empty so the next caller tries again.
pub struct Database {
    options: DatabaseOptions,
    pool: OnceCell<PgPool>,
}

const COLUMNS: &str = "id, body";

impl Database {
    pub fn new(options: DatabaseOptions) -> Self {
        Self {
            options,
            pool: OnceCell::new(),
        }
    }

    pub async fn pool(&self) -> Result<&PgPool, StoreError> {
        self.pool
            .get_or_try_init(|| async {
                let pool = PgPoolOptions::new()
                    .max_connections(self.options.max_connections)
                    .acquire_timeout(self.options.acquire_timeout)
                    .connect(&self.options.url)
                    .await?;

                sqlx::migrate!("./migrations").run(&pool).await?;

                tracing::info!("Database connected and migrations applied");
                Ok::<_, StoreError>(pool)
            })
            .await
    }
}

fn to_document(row: PgRow) -> Result<Document, StoreError> {
    let id: String = row.try_get("id")?;
    let Json(body): Json<Body> = row.try_get("body")?;
    let id = ObjectId::parse_str(&id).map_err(|_| StoreError::CorruptId(id))?;
    Ok(Document { id, body })
}

#[async_trait]
impl DocumentStore for Database {
    async fn insert_one(&self, collection: Collection, body: Body) -> Result<Document, StoreError> {
        let id = ObjectId::new();

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection.as_str())
            .bind(id.to_hex())
            .bind(Json(&body))
            .execute(self.pool().await?)
            .await?;

        Ok(Document { id, body })
    }

    async fn find_one(
        &self,
        collection: Collection,
        id: ObjectId,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM documents WHERE collection = $1 AND id = $2"
        ))
        .bind(collection.as_str())
        .bind(id.to_hex())
        .fetch_optional(self.pool().await?)
        .await?;

        row.map(to_document).transpose()
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS} FROM documents
            WHERE collection = $1 AND body @> $2
            ORDER BY body -> $5 ASC NULLS LAST, body->>'created_at' DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(collection.as_str())
        .bind(Json(filter.as_body()))
        .bind(limit)
        .bind(offset)
        .bind(filter.sort_field())
        .fetch_all(self.pool().await?)
        .await?;

        rows.into_iter().map(to_document).collect()
    }

    async fn update_one(
        &self,
        collection: Collection,
        id: ObjectId,
        set: Body,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE documents SET body = body || $3
            WHERE collection = $1 AND id = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(collection.as_str())
        .bind(id.to_hex())
        .bind(Json(&set))
        .fetch_optional(self.pool().await?)
        .await?;

        row.map(to_document).transpose()
    }

    async fn append(
        &self,
        collection: Collection,
        id: ObjectId,
        field: &str,
        value: Value,
        set: Body,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE documents
            SET body = jsonb_set(
                    body,
                    ARRAY[$3::text],
                    COALESCE(body -> $3::text, '[]'::jsonb) || jsonb_build_array($4::jsonb)
                ) || $5
            WHERE collection = $1 AND id = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(collection.as_str())
        .bind(id.to_hex())
        .bind(field)
        .bind(Json(&value))
        .bind(Json(&set))
        .fetch_optional(self.pool().await?)
        .await?;

        row.map(to_document).transpose()
    }

    async fn delete_one(&self, collection: Collection, id: ObjectId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id.to_hex())
            .execute(self.pool().await?)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
