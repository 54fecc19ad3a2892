use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    api::JsonBody,
    auth::SessionUser,
    db::{Collection, DocumentStore, Filter, ObjectId},
    error::{AppError, Result},
    models::{
        common::{new_document, update_set, Deleted, PaginationParams},
        project::{CreateProjectRequest, Project, ProjectListParams, UpdateProjectRequest},
    },
};

pub async fn list(
    State(store): State<Arc<dyn DocumentStore>>,
    Query(params): Query<ProjectListParams>,
) -> Result<Json<Vec<Project>>> {
    let page = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    let filter = Filter::new()
        .eq_opt("category", params.category)
        .eq_opt("featured", params.featured);

    let docs = store
        .find_many(Collection::Projects, &filter, page.limit(), page.offset())
        .await
        .map_err(AppError::store("projects.list", "*"))?;

    let projects = docs
        .into_iter()
        .map(|d| d.decode())
        .collect::<std::result::Result<Vec<Project>, _>>()
        .map_err(AppError::store("projects.list", "*"))?;

    Ok(Json(projects))
}

pub async fn get_one(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    let id: ObjectId = id.parse()?;

    let project = store
        .find_one(Collection::Projects, id)
        .await
        .map_err(AppError::store("projects.get", id))?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?
        .decode()
        .map_err(AppError::store("projects.get", id))?;

    Ok(Json(project))
}

pub async fn create(
    State(store): State<Arc<dyn DocumentStore>>,
    SessionUser(user): SessionUser,
    JsonBody(req): JsonBody<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>)> {
    req.validate()?;

    let doc = store
        .insert_one(Collection::Projects, new_document(&req)?)
        .await
        .map_err(AppError::store("projects.create", &req.title))?;

    tracing::info!("Project {} created by {}", doc.id, user.uid);

    let project = doc
        .decode()
        .map_err(AppError::store("projects.create", &req.title))?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn update(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(id): Path<String>,
    SessionUser(_user): SessionUser,
    JsonBody(req): JsonBody<UpdateProjectRequest>,
) -> Result<Json<Project>> {
    let id: ObjectId = id.parse()?;
    req.validate()?;
    let set = update_set(&req)?;

    let project = store
        .update_one(Collection::Projects, id, set)
        .await
        .map_err(AppError::store("projects.update", id))?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?
        .decode()
        .map_err(AppError::store("projects.update", id))?;

    Ok(Json(project))
}

pub async fn delete(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(id): Path<String>,
    SessionUser(user): SessionUser,
) -> Result<Json<Deleted>> {
    let id: ObjectId = id.parse()?;

    let deleted = store
        .delete_one(Collection::Projects, id)
        .await
        .map_err(AppError::store("projects.delete", id))?;

    if !deleted {
        return Err(AppError::NotFound("Project not found".into()));
    }

    tracing::info!("Project {} deleted by {}", id, user.uid);
    Ok(Json(Deleted {
        deleted: true,
        id: id.to_hex(),
    }))
}
