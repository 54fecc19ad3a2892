//! Document storage.
//!
//! Handlers talk to a [`DocumentStore`]: a small set of collection-scoped
//! operations over JSON documents keyed by [`ObjectId`]. The production
//! implementation is [`Database`] (PostgreSQL, one JSONB row per document).

mod object_id;
mod postgres;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use object_id::{InvalidObjectId, ObjectId};
pub use postgres::{Database, DatabaseOptions};

/// JSON object body of a stored document. The identifier lives outside it.
pub type Body = Map<String, Value>;

/// Named collections. `as_str()` is the storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Projects,
    TeamMembers,
    SiteInfo,
    Tickets,
    Admins,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Projects => "projects",
            Collection::TeamMembers => "team_members",
            Collection::SiteInfo => "site_info",
            Collection::Tickets => "tickets",
            Collection::Admins => "admins",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: ObjectId,
    pub body: Body,
}

impl Document {
    /// Deserialize into a typed model, exposing the identifier as `id`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, StoreError> {
        let mut body = self.body;
        body.insert("id".into(), Value::String(self.id.to_hex()));
        serde_json::from_value(Value::Object(body)).map_err(StoreError::Decode)
    }
}

/// Top-level field equality filter. An empty filter matches everything.
///
/// Results come back newest first unless [`Filter::order_by`] names a field,
/// in which case they are ascending on that field with newest first as the
/// tie-break. Documents missing the field sort last.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    fields: Body,
    order_by: Option<&'static str>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Adds the condition only when a value is present.
    pub fn eq_opt<V: Into<Value>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    pub fn order_by(mut self, field: &'static str) -> Self {
        self.order_by = Some(field);
        self
    }

    pub fn as_body(&self) -> &Body {
        &self.fields
    }

    pub fn sort_field(&self) -> Option<&'static str> {
        self.order_by
    }

    pub fn matches(&self, body: &Body) -> bool {
        self.fields.iter().all(|(k, v)| body.get(k) == Some(v))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("stored document could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("stored document has a corrupt identifier: {0}")]
    CorruptId(String),
}

/// Collection-scoped document operations.
///
/// Every mutating call is a single statement; `update_one` and `append`
/// return the document as it is after the write, or `None` when no document
/// has the given id (in which case nothing was written).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, collection: Collection, body: Body) -> Result<Document, StoreError>;

    async fn find_one(
        &self,
        collection: Collection,
        id: ObjectId,
    ) -> Result<Option<Document>, StoreError>;

    /// Ordered as described on [`Filter`].
    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>, StoreError>;

    /// Shallow-merges `set` into the stored body.
    async fn update_one(
        &self,
        collection: Collection,
        id: ObjectId,
        set: Body,
    ) -> Result<Option<Document>, StoreError>;

    /// Pushes `value` onto the array at `field` (created if missing) and
    /// shallow-merges `set`.
    async fn append(
        &self,
        collection: Collection,
        id: ObjectId,
        field: &str,
        value: Value,
        set: Body,
    ) -> Result<Option<Document>, StoreError>;

    async fn delete_one(&self, collection: Collection, id: ObjectId) -> Result<bool, StoreError>;
}
