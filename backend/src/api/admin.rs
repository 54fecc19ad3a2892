use std::sync::OnceLock;

use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{extract::State, Json};
use rand_core::OsRng;
use validator::Validate;

use crate::{
    api::JsonBody,
    auth::{AdminAccess, AdminUser},
    db::{Collection, Filter},
    error::{AppError, Result},
    models::admin::{Admin, LoginRequest, LoginResponse},
    AppState,
};

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    req.validate()?;
    let email = req.email.trim().to_lowercase();

    let found = state
        .store
        .find_many(Collection::Admins, &Filter::new().eq("email", email.as_str()), 1, 0)
        .await
        .map_err(AppError::store("admin.login", "*"))?
        .into_iter()
        .next();

    let Some(doc) = found else {
        // Unknown emails pay the same argon2 cost as known ones.
        if let Some(hash) = dummy_hash() {
            if let Ok(parsed) = PasswordHash::new(hash) {
                let _ = Argon2::default().verify_password(req.password.as_bytes(), &parsed);
            }
        }
        tracing::warn!(cause = "unknown email", "Admin login rejected");
        return Err(AppError::Unauthorized);
    };

    let id = doc.id;
    let admin: Admin = doc.decode().map_err(AppError::store("admin.login", id))?;

    let parsed = PasswordHash::new(&admin.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid stored hash for admin {}", admin.id)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed)
        .map_err(|_| {
            tracing::warn!(cause = "bad password", "Admin login rejected for {}", admin.id);
            AppError::Unauthorized
        })?;

    let token = state
        .tokens
        .issue_admin_token(&admin.id, &admin.email, Some(&admin.role))
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("issuing admin token")))?;

    tracing::info!("Admin {} logged in", admin.id);

    Ok(Json(LoginResponse {
        token,
        admin: AdminAccess {
            admin_id: admin.id,
            email: admin.email,
            role: admin.role,
        },
    }))
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(b"no-such-admin", &salt)
                .map(|h| h.to_string())
                .ok()
        })
        .as_deref()
}

pub async fn me(AdminUser(admin): AdminUser) -> Json<AdminAccess> {
    Json(admin)
}
