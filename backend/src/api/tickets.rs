//! Support tickets.
//!
//! Opening a ticket is public and hands the requester a ticket-access token
//! scoped to that one ticket. Reads and writes on a single ticket accept
//! either that token or, with `X-Admin-Request: true`, an admin token.
//! Listing and deleting are admin-only.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use validator::Validate;

use crate::{
    api::JsonBody,
    auth::{verifier, AdminUser, TicketViewer},
    db::{Collection, Filter, ObjectId},
    error::{AppError, Result},
    models::{
        common::{new_document, timestamp, update_set, Deleted, PaginationParams},
        ticket::{
            CreateReplyRequest, CreateTicketRequest, CreatedTicket, NewTicket, ReplyAuthor,
            SecureTicketParams, Ticket, TicketListParams, TicketStatus, UpdateTicketRequest,
        },
    },
    AppState,
};

fn authorize(state: &AppState, headers: &HeaderMap, id: ObjectId) -> Result<TicketViewer> {
    verifier::verify_ticket_request(headers, &state.tokens, &id.to_hex()).ok_or(AppError::Unauthorized)
}

fn not_found() -> AppError {
    AppError::NotFound("Ticket not found".into())
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateTicketRequest>,
) -> Result<(StatusCode, Json<CreatedTicket>)> {
    req.validate()?;

    let new = NewTicket {
        name: req.name.trim(),
        email: req.email.trim(),
        subject: req.subject.trim(),
        message: &req.message,
        status: TicketStatus::Open,
        priority: req.priority,
        replies: Vec::new(),
    };

    let doc = state
        .store
        .insert_one(Collection::Tickets, new_document(&new)?)
        .await
        .map_err(AppError::store("tickets.create", "*"))?;

    let access_token = state
        .tokens
        .issue_ticket_token(&doc.id.to_hex(), new.email)
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("issuing ticket token")))?;

    tracing::info!("Ticket {} opened", doc.id);

    let ticket = doc.decode().map_err(AppError::store("tickets.create", "*"))?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedTicket {
            ticket,
            access_token,
        }),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(params): Query<TicketListParams>,
) -> Result<Json<Vec<Ticket>>> {
    let page = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    let filter = Filter::new().eq_opt("status", params.status.map(|s| s.as_str()));

    let docs = state
        .store
        .find_many(Collection::Tickets, &filter, page.limit(), page.offset())
        .await
        .map_err(AppError::store("tickets.list", "*"))?;

    let tickets = docs
        .into_iter()
        .map(|d| d.decode())
        .collect::<std::result::Result<Vec<Ticket>, _>>()
        .map_err(AppError::store("tickets.list", "*"))?;

    Ok(Json(tickets))
}

/// Secure-link view: the ticket token arrives as a query parameter.
pub async fn secure_view(
    State(state): State<AppState>,
    Query(params): Query<SecureTicketParams>,
) -> Result<Json<Ticket>> {
    let access = verifier::verify_ticket_token(&params.token, &state.tokens, None)
        .ok_or(AppError::Unauthorized)?;

    let id: ObjectId = access.ticket_id.parse().map_err(|_| not_found())?;

    let ticket = state
        .store
        .find_one(Collection::Tickets, id)
        .await
        .map_err(AppError::store("tickets.secure_view", id))?
        .ok_or_else(not_found)?
        .decode()
        .map_err(AppError::store("tickets.secure_view", id))?;

    Ok(Json(ticket))
}

pub async fn get_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Ticket>> {
    let id: ObjectId = id.parse()?;
    authorize(&state, &headers, id)?;

    let ticket = state
        .store
        .find_one(Collection::Tickets, id)
        .await
        .map_err(AppError::store("tickets.get", id))?
        .ok_or_else(not_found)?
        .decode()
        .map_err(AppError::store("tickets.get", id))?;

    Ok(Json(ticket))
}

pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateTicketRequest>,
) -> Result<Json<Ticket>> {
    let id: ObjectId = id.parse()?;
    let viewer = authorize(&state, &headers, id)?;

    if !viewer.is_admin() {
        if req.priority.is_some() {
            return Err(AppError::BadRequest(
                "Only support staff can change ticket priority".into(),
            ));
        }
        if matches!(req.status, Some(s) if s != TicketStatus::Closed) {
            return Err(AppError::BadRequest(
                "Requesters can only close their ticket".into(),
            ));
        }
    }

    let set = update_set(&req)?;

    let ticket: Ticket = state
        .store
        .update_one(Collection::Tickets, id, set)
        .await
        .map_err(AppError::store("tickets.update", id))?
        .ok_or_else(not_found)?
        .decode()
        .map_err(AppError::store("tickets.update", id))?;

    tracing::info!("Ticket {} updated, status {}", id, ticket.status.as_str());
    Ok(Json(ticket))
}

pub async fn reply(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CreateReplyRequest>,
) -> Result<(StatusCode, Json<Ticket>)> {
    let id: ObjectId = id.parse()?;
    let viewer = authorize(&state, &headers, id)?;
    req.validate()?;

    let author = match viewer {
        TicketViewer::Admin(_) => ReplyAuthor::Admin,
        TicketViewer::Holder(_) => ReplyAuthor::Requester,
    };

    let now = Value::String(timestamp(OffsetDateTime::now_utc())?);
    let mut reply = Map::new();
    reply.insert("author".into(), serde_json::to_value(author).map_err(anyhow::Error::from)?);
    reply.insert("message".into(), Value::String(req.message));
    reply.insert("created_at".into(), now.clone());

    let mut set = Map::new();
    set.insert("updated_at".into(), now);

    let ticket = state
        .store
        .append(Collection::Tickets, id, "replies", Value::Object(reply), set)
        .await
        .map_err(AppError::store("tickets.reply", id))?
        .ok_or_else(not_found)?
        .decode()
        .map_err(AppError::store("tickets.reply", id))?;

    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn delete(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Deleted>> {
    let id: ObjectId = id.parse()?;

    let deleted = state
        .store
        .delete_one(Collection::Tickets, id)
        .await
        .map_err(AppError::store("tickets.delete", id))?;

    if !deleted {
        return Err(not_found());
    }

    tracing::info!("Ticket {} deleted by admin {}", id, admin.admin_id);
    Ok(Json(Deleted {
        deleted: true,
        id: id.to_hex(),
    }))
}
