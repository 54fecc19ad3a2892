//! Request-level token verification.
//!
//! Every function here maps a request's headers to a verified identity or
//! `None`. Causes are logged; callers only ever see "no identity", so a
//! missing header and a bad token look the same from the outside.

use axum::http::HeaderMap;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use sha2::{Digest, Sha256};

use super::{
    identity::{IdentityProvider, SessionIdentity},
    tokens::{AdminAccess, TicketAccess, TokenCodec},
};

pub const ADMIN_REQUEST_HEADER: &str = "x-admin-request";

/// Who is acting on a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketViewer {
    Admin(AdminAccess),
    Holder(TicketAccess),
}

impl TicketViewer {
    pub fn is_admin(&self) -> bool {
        matches!(self, TicketViewer::Admin(_))
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let Authorization(bearer) = headers.typed_get::<Authorization<Bearer>>()?;
    let token = bearer.token().trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// `X-Admin-Request: true` routes ticket requests to admin verification.
pub fn is_admin_request(headers: &HeaderMap) -> bool {
    headers
        .get(ADMIN_REQUEST_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Short, non-reversible token label for logs.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}

pub async fn verify_session(
    headers: &HeaderMap,
    provider: &dyn IdentityProvider,
) -> Option<SessionIdentity> {
    let token = extract_bearer_token(headers)?;

    match provider.verify_id_token(&token, true).await {
        Ok(identity) => Some(identity),
        Err(e) => {
            tracing::warn!(
                cause = e.cause(),
                token = %fingerprint(&token),
                "Session token rejected: {}",
                e
            );
            None
        }
    }
}

pub fn verify_admin_token(token: &str, codec: &TokenCodec) -> Option<AdminAccess> {
    match codec.decode_admin_token(token) {
        Ok(admin) => Some(admin),
        Err(e) => {
            tracing::warn!(
                cause = e.cause(),
                token = %fingerprint(token),
                "Admin token rejected: {}",
                e.cause()
            );
            None
        }
    }
}

/// Decodes a ticket token, optionally requiring it to be scoped to `ticket_id`.
pub fn verify_ticket_token(
    token: &str,
    codec: &TokenCodec,
    ticket_id: Option<&str>,
) -> Option<TicketAccess> {
    let access = match codec.decode_ticket_token(token) {
        Ok(access) => access,
        Err(e) => {
            tracing::warn!(
                cause = e.cause(),
                token = %fingerprint(token),
                "Ticket token rejected: {}",
                e.cause()
            );
            return None;
        }
    };

    if let Some(expected) = ticket_id {
        if access.ticket_id != expected {
            tracing::warn!(
                cause = "ticket mismatch",
                token = %fingerprint(token),
                "Ticket token for {} presented for ticket {}",
                access.ticket_id,
                expected
            );
            return None;
        }
    }

    Some(access)
}

pub fn verify_admin(headers: &HeaderMap, codec: &TokenCodec) -> Option<AdminAccess> {
    let token = extract_bearer_token(headers)?;
    verify_admin_token(&token, codec)
}

/// Admin branch when `X-Admin-Request` is set, otherwise a ticket token
/// scoped to `ticket_id`.
pub fn verify_ticket_request(
    headers: &HeaderMap,
    codec: &TokenCodec,
    ticket_id: &str,
) -> Option<TicketViewer> {
    let token = extract_bearer_token(headers)?;

    if is_admin_request(headers) {
        verify_admin_token(&token, codec).map(TicketViewer::Admin)
    } else {
        verify_ticket_token(&token, codec, Some(ticket_id)).map(TicketViewer::Holder)
    }
}
