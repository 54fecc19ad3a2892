pub mod identity;
pub mod tokens;
pub mod verifier;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::error::AppError;
use crate::AppState;

pub use identity::{FirebaseAuth, IdentityError, IdentityProvider, SessionIdentity};
pub use tokens::{AdminAccess, TicketAccess, TokenCodec, TokenError};
pub use verifier::TicketViewer;

/// Dashboard user, verified by the identity provider.
pub struct SessionUser(pub SessionIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        verifier::verify_session(&parts.headers, app_state.identity.as_ref())
            .await
            .map(SessionUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// Support admin, verified from a self-issued admin-access token.
pub struct AdminUser(pub AdminAccess);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        verifier::verify_admin(&parts.headers, &app_state.tokens)
            .map(AdminUser)
            .ok_or(AppError::Unauthorized)
    }
}
