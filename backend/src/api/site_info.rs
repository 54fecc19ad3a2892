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
        site_info::{CreateSiteInfoRequest, SiteInfo, UpdateSiteInfoRequest},
    },
};

pub async fn list(
    State(store): State<Arc<dyn DocumentStore>>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Vec<SiteInfo>>> {
    let docs = store
        .find_many(Collection::SiteInfo, &Filter::new(), page.limit(), page.offset())
        .await
        .map_err(AppError::store("site_info.list", "*"))?;

    let entries = docs
        .into_iter()
        .map(|d| d.decode())
        .collect::<std::result::Result<Vec<SiteInfo>, _>>()
        .map_err(AppError::store("site_info.list", "*"))?;

    Ok(Json(entries))
}

pub async fn get_one(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(id): Path<String>,
) -> Result<Json<SiteInfo>> {
    let id: ObjectId = id.parse()?;

    let info = store
        .find_one(Collection::SiteInfo, id)
        .await
        .map_err(AppError::store("site_info.get", id))?
        .ok_or_else(|| AppError::NotFound("Site info not found".into()))?
        .decode()
        .map_err(AppError::store("site_info.get", id))?;

    Ok(Json(info))
}

pub async fn create(
    State(store): State<Arc<dyn DocumentStore>>,
    SessionUser(user): SessionUser,
    JsonBody(req): JsonBody<CreateSiteInfoRequest>,
) -> Result<(StatusCode, Json<SiteInfo>)> {
    req.validate()?;

    let doc = store
        .insert_one(Collection::SiteInfo, new_document(&req)?)
        .await
        .map_err(AppError::store("site_info.create", &req.title))?;

    tracing::info!("Site info {} created by {}", doc.id, user.uid);

    let info = doc.decode().map_err(AppError::store("site_info.create", &req.title))?;
    Ok((StatusCode::CREATED, Json(info)))
}

pub async fn update(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(id): Path<String>,
    SessionUser(_user): SessionUser,
    JsonBody(req): JsonBody<UpdateSiteInfoRequest>,
) -> Result<Json<SiteInfo>> {
    let id: ObjectId = id.parse()?;
    req.validate()?;
    let set = update_set(&req)?;

    let info = store
        .update_one(Collection::SiteInfo, id, set)
        .await
        .map_err(AppError::store("site_info.update", id))?
        .ok_or_else(|| AppError::NotFound("Site info not found".into()))?
        .decode()
        .map_err(AppError::store("site_info.update", id))?;

    Ok(Json(info))
}

pub async fn delete(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(id): Path<String>,
    SessionUser(user): SessionUser,
) -> Result<Json<Deleted>> {
    let id: ObjectId = id.parse()?;

    let deleted = store
        .delete_one(Collection::SiteInfo, id)
        .await
        .map_err(AppError::store("site_info.delete", id))?;

    if !deleted {
        return Err(AppError::NotFound("Site info not found".into()));
    }

    tracing::info!("Site info {} deleted by {}", id, user.uid);
    Ok(Json(Deleted {
        deleted: true,
        id: id.to_hex(),
    }))
}
