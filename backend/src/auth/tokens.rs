//! Self-issued tokens for the support flow.
//!
//! Two claim families share one HS256 secret and are told apart by the
//! `type` claim. Decoding checks the signature and expiry first, then the
//! discriminant, so a valid admin token is never accepted as a ticket token
//! and vice versa.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};

pub const TICKET_TOKEN_TTL: Duration = Duration::days(30);
pub const ADMIN_TOKEN_TTL: Duration = Duration::days(7);

pub const DEFAULT_ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(rename = "ticket-access")]
    TicketAccess,
    #[serde(rename = "admin-access")]
    AdminAccess,
}

impl TokenKind {
    fn as_str(&self) -> &'static str {
        match self {
            TokenKind::TicketAccess => "ticket-access",
            TokenKind::AdminAccess => "admin-access",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketClaims {
    pub ticket_id: String,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminClaims {
    pub admin_id: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// What a verified ticket token grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketAccess {
    pub ticket_id: String,
    pub email: String,
}

/// What a verified admin token grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccess {
    pub admin_id: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFailure {
    Expired,
    InvalidSignature,
    Malformed,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token type")]
    InvalidTokenType,

    #[error("token expired or malformed")]
    ExpiredOrMalformed(TokenFailure),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl TokenError {
    /// Short label for server logs.
    pub fn cause(&self) -> &'static str {
        match self {
            TokenError::InvalidTokenType => "wrong token type",
            TokenError::ExpiredOrMalformed(TokenFailure::Expired) => "expired",
            TokenError::ExpiredOrMalformed(TokenFailure::InvalidSignature) => "invalid signature",
            TokenError::ExpiredOrMalformed(TokenFailure::Malformed) => "malformed",
            TokenError::Signing(_) => "signing failed",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        let failure = match e.kind() {
            ErrorKind::ExpiredSignature => TokenFailure::Expired,
            ErrorKind::InvalidSignature => TokenFailure::InvalidSignature,
            _ => TokenFailure::Malformed,
        };
        TokenError::ExpiredOrMalformed(failure)
    }
}

/// Issues and decodes ticket-access and admin-access tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "iat"]);
        // Both ends share one clock; `exp` is exact.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue_ticket_token(&self, ticket_id: &str, email: &str) -> Result<String, TokenError> {
        self.issue_ticket_token_at(ticket_id, email, OffsetDateTime::now_utc())
    }

    pub fn issue_ticket_token_at(
        &self,
        ticket_id: &str,
        email: &str,
        issued_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let claims = TicketClaims {
            ticket_id: ticket_id.to_string(),
            email: email.to_string(),
            kind: TokenKind::TicketAccess,
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + TICKET_TOKEN_TTL).unix_timestamp(),
        };
        self.sign(&claims)
    }

    /// `role` defaults to [`DEFAULT_ADMIN_ROLE`].
    pub fn issue_admin_token(
        &self,
        admin_id: &str,
        email: &str,
        role: Option<&str>,
    ) -> Result<String, TokenError> {
        self.issue_admin_token_at(admin_id, email, role, OffsetDateTime::now_utc())
    }

    pub fn issue_admin_token_at(
        &self,
        admin_id: &str,
        email: &str,
        role: Option<&str>,
        issued_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let claims = AdminClaims {
            admin_id: admin_id.to_string(),
            email: email.to_string(),
            role: role.unwrap_or(DEFAULT_ADMIN_ROLE).to_string(),
            kind: TokenKind::AdminAccess,
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + ADMIN_TOKEN_TTL).unix_timestamp(),
        };
        self.sign(&claims)
    }

    pub fn decode_ticket_token(&self, token: &str) -> Result<TicketAccess, TokenError> {
        let claims: TicketClaims = self.decode_kind(token, TokenKind::TicketAccess)?;
        Ok(TicketAccess {
            ticket_id: claims.ticket_id,
            email: claims.email,
        })
    }

    pub fn decode_admin_token(&self, token: &str) -> Result<AdminAccess, TokenError> {
        let claims: AdminClaims = self.decode_kind(token, TokenKind::AdminAccess)?;
        Ok(AdminAccess {
            admin_id: claims.admin_id,
            email: claims.email,
            role: claims.role,
        })
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(TokenError::Signing)
    }

    fn decode_kind<T>(&self, token: &str, expected: TokenKind) -> Result<T, TokenError>
    where
        T: for<'de> Deserialize<'de>,
    {
        // Decode loosely first so a foreign-family token is reported as a
        // type mismatch rather than a missing-field parse failure.
        let claims = decode::<Map<String, Value>>(token, &self.decoding, &self.validation)?.claims;

        match claims.get("type").and_then(Value::as_str) {
            Some(kind) if kind == expected.as_str() => {}
            _ => return Err(TokenError::InvalidTokenType),
        }

        serde_json::from_value(Value::Object(claims))
            .map_err(|_| TokenError::ExpiredOrMalformed(TokenFailure::Malformed))
    }
}
