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
        team::{CreateTeamMemberRequest, TeamListParams, TeamMember, UpdateTeamMemberRequest},
    },
};

pub async fn list(
    State(store): State<Arc<dyn DocumentStore>>,
    Query(params): Query<TeamListParams>,
) -> Result<Json<Vec<TeamMember>>> {
    let page = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    let mut filter = Filter::new().order_by("display_order");
    if !params.include_inactive.unwrap_or(false) {
        filter = filter.eq("active", true);
    }

    let docs = store
        .find_many(Collection::TeamMembers, &filter, page.limit(), page.offset())
        .await
        .map_err(AppError::store("team.list", "*"))?;

    let members = docs
        .into_iter()
        .map(|d| d.decode())
        .collect::<std::result::Result<Vec<TeamMember>, _>>()
        .map_err(AppError::store("team.list", "*"))?;

    Ok(Json(members))
}

pub async fn get_one(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(id): Path<String>,
) -> Result<Json<TeamMember>> {
    let id: ObjectId = id.parse()?;

    let member = store
        .find_one(Collection::TeamMembers, id)
        .await
        .map_err(AppError::store("team.get", id))?
        .ok_or_else(|| AppError::NotFound("Team member not found".into()))?
        .decode()
        .map_err(AppError::store("team.get", id))?;

    Ok(Json(member))
}

pub async fn create(
    State(store): State<Arc<dyn DocumentStore>>,
    SessionUser(user): SessionUser,
    JsonBody(req): JsonBody<CreateTeamMemberRequest>,
) -> Result<(StatusCode, Json<TeamMember>)> {
    req.validate()?;

    let doc = store
        .insert_one(Collection::TeamMembers, new_document(&req)?)
        .await
        .map_err(AppError::store("team.create", &req.name))?;

    tracing::info!("Team member {} created by {}", doc.id, user.uid);

    let member = doc.decode().map_err(AppError::store("team.create", &req.name))?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn update(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(id): Path<String>,
    SessionUser(_user): SessionUser,
    JsonBody(req): JsonBody<UpdateTeamMemberRequest>,
) -> Result<Json<TeamMember>> {
    let id: ObjectId = id.parse()?;
    req.validate()?;
    let set = update_set(&req)?;

    let member = store
        .update_one(Collection::TeamMembers, id, set)
        .await
        .map_err(AppError::store("team.update", id))?
        .ok_or_else(|| AppError::NotFound("Team member not found".into()))?
        .decode()
        .map_err(AppError::store("team.update", id))?;

    Ok(Json(member))
}

pub async fn delete(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(id): Path<String>,
    SessionUser(user): SessionUser,
) -> Result<Json<Deleted>> {
    let id: ObjectId = id.parse()?;

    let deleted = store
        .delete_one(Collection::TeamMembers, id)
        .await
        .map_err(AppError::store("team.delete", id))?;

    if !deleted {
        return Err(AppError::NotFound("Team member not found".into()));
    }

    tracing::info!("Team member {} deleted by {}", id, user.uid);
    Ok(Json(Deleted {
        deleted: true,
        id: id.to_hex(),
    }))
}
