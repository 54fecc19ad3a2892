use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{macros::format_description, OffsetDateTime};

use crate::{
    db::Body,
    error::{AppError, Result},
};

/// Pagination query params shared across list endpoints.
/// `limit` defaults to 100, capped at 500. `offset` defaults to 0.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 500)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Fields the server owns. Never taken from a request body.
pub const RESERVED_FIELDS: &[&str] = &["id", "_id", "created_at", "updated_at"];

/// Fixed-width UTC timestamp so stored values sort lexically.
pub fn timestamp(at: OffsetDateTime) -> Result<String> {
    let format =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z");
    at.to_offset(time::UtcOffset::UTC)
        .format(&format)
        .context("formatting timestamp")
        .map_err(AppError::from)
}

fn to_body<T: Serialize>(value: &T) -> Result<Body> {
    match serde_json::to_value(value).context("serializing document")? {
        Value::Object(mut body) => {
            for field in RESERVED_FIELDS {
                body.remove(*field);
            }
            Ok(body)
        }
        other => Err(AppError::Internal(anyhow::anyhow!(
            "document must serialize to an object, got {other}"
        ))),
    }
}

/// Body for a new document with server-assigned timestamps.
pub fn new_document<T: Serialize>(request: &T) -> Result<Body> {
    let mut body = to_body(request)?;
    let now = Value::String(timestamp(OffsetDateTime::now_utc())?);
    body.insert("created_at".into(), now.clone());
    body.insert("updated_at".into(), now);
    Ok(body)
}

/// Set-fields for an update: reserved fields dropped, `updated_at` stamped.
pub fn update_set<T: Serialize>(patch: &T) -> Result<Body> {
    let mut set = to_body(patch)?;
    if set.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }
    set.insert(
        "updated_at".into(),
        Value::String(timestamp(OffsetDateTime::now_utc())?),
    );
    Ok(set)
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
    pub id: String,
}
