//! Startup seeding.

use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
use rand_core::OsRng;

use crate::{
    auth::tokens::DEFAULT_ADMIN_ROLE,
    config::BootstrapAdmin,
    db::{Collection, DocumentStore, Filter, ObjectId},
    models::{admin::NewAdmin, common::new_document},
};

/// Creates the configured admin account unless one with that email exists.
/// Returns the new admin's id when one was created.
pub async fn ensure_admin(
    store: &dyn DocumentStore,
    admin: &BootstrapAdmin,
) -> anyhow::Result<Option<ObjectId>> {
    let email = admin.email.trim().to_lowercase();

    let existing = store
        .find_many(Collection::Admins, &Filter::new().eq("email", email.as_str()), 1, 0)
        .await?;
    if !existing.is_empty() {
        tracing::debug!("Bootstrap admin {} already present", email);
        return Ok(None);
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(admin.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash bootstrap admin password: {}", e))?
        .to_string();

    let body = new_document(&NewAdmin {
        email: &email,
        password_hash: &password_hash,
        role: DEFAULT_ADMIN_ROLE,
    })
    .map_err(|e| anyhow::anyhow!("{}", e))?;

    let doc = store.insert_one(Collection::Admins, body).await?;
    tracing::info!("Created bootstrap admin {} ({})", email, doc.id);
    Ok(Some(doc.id))
}
