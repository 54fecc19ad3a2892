pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod images;
pub mod models;

use std::sync::Arc;

use auth::{IdentityProvider, TokenCodec};
use db::DocumentStore;
use images::ImageHost;

/// Shared application state available to all handlers via axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub tokens: TokenCodec,
    pub identity: Arc<dyn IdentityProvider>,
    pub images: Arc<dyn ImageHost>,
}

impl axum::extract::FromRef<AppState> for Arc<dyn DocumentStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}
