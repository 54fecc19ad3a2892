use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::{
    api::JsonBody,
    auth::SessionUser,
    error::{AppError, Result},
    images::ImageHostError,
    models::upload::{ImageUploadRequest, UploadedImage},
    AppState,
};

pub async fn upload_image(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    JsonBody(req): JsonBody<ImageUploadRequest>,
) -> Result<(StatusCode, Json<UploadedImage>)> {
    req.validate()?;

    let image = state
        .images
        .upload(&req.image, req.name.as_deref())
        .await
        .map_err(|e| match e {
            ImageHostError::Rejected(msg) => AppError::BadRequest(format!("Image rejected: {msg}")),
            other => AppError::Internal(anyhow::Error::new(other).context("uploading image")),
        })?;

    tracing::info!("Image uploaded by {}: {}", user.uid, image.url);
    Ok((StatusCode::CREATED, Json(image)))
}
