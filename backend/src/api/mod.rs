pub mod admin;
pub mod projects;
pub mod site_info;
pub mod team;
pub mod tickets;
pub mod uploads;

use axum::{
    extract::FromRequest,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{error::AppError, AppState};

/// JSON request body whose rejections (missing fields, wrong types, bad
/// syntax) surface as 400 through [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        // Projects
        .route("/api/projects", get(projects::list).post(projects::create))
        .route(
            "/api/projects/:id",
            get(projects::get_one).patch(projects::update).delete(projects::delete),
        )
        // Team
        .route("/api/team", get(team::list).post(team::create))
        .route(
            "/api/team/:id",
            get(team::get_one).patch(team::update).delete(team::delete),
        )
        // Site info
        .route("/api/site-info", get(site_info::list).post(site_info::create))
        .route(
            "/api/site-info/:id",
            get(site_info::get_one).patch(site_info::update).delete(site_info::delete),
        )
        // Uploads
        .route("/api/uploads/image", post(uploads::upload_image))
        // Admin
        .route("/api/admin/login", post(admin::login))
        .route("/api/admin/me", get(admin::me))
        // Tickets
        .route("/api/tickets", get(tickets::list).post(tickets::create))
        .route("/api/tickets/secure", get(tickets::secure_view))
        .route(
            "/api/tickets/:id",
            get(tickets::get_one).patch(tickets::update).delete(tickets::delete),
        )
        .route("/api/tickets/:id/replies", post(tickets::reply))
        .with_state(state)
}
