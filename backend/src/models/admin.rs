use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::auth::AdminAccess;

/// Support admin account as stored.
#[derive(Debug, Clone, Deserialize)]
pub struct Admin {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct NewAdmin<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub admin: AdminAccess,
}
