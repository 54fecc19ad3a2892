//! Image uploads, proxied to ImgBB.

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::upload::UploadedImage;

const IMGBB_UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";

#[derive(Debug, thiserror::Error)]
pub enum ImageHostError {
    #[error("image host is not configured")]
    NotConfigured,

    #[error("image host request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("image host rejected upload: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// `image` is base64 data or a public URL.
    async fn upload(&self, image: &str, name: Option<&str>)
        -> Result<UploadedImage, ImageHostError>;
}

#[derive(Debug, Deserialize)]
struct ImgBbResponse {
    #[serde(default)]
    success: bool,
    data: Option<UploadedImage>,
    error: Option<ImgBbError>,
}

#[derive(Debug, Deserialize)]
struct ImgBbError {
    message: String,
}

#[derive(Clone)]
pub struct ImgBb {
    api_key: Option<String>,
    http: reqwest::Client,
}

impl ImgBb {
    pub fn new(api_key: Option<String>, http: reqwest::Client) -> Self {
        Self { api_key, http }
    }
}

#[async_trait]
impl ImageHost for ImgBb {
    async fn upload(
        &self,
        image: &str,
        name: Option<&str>,
    ) -> Result<UploadedImage, ImageHostError> {
        let key = self.api_key.as_deref().ok_or(ImageHostError::NotConfigured)?;

        let mut form = vec![("image", image)];
        if let Some(name) = name {
            form.push(("name", name));
        }

        let resp: ImgBbResponse = self
            .http
            .post(IMGBB_UPLOAD_URL)
            .query(&[("key", key)])
            .form(&form)
            .send()
            .await?
            .json()
            .await?;

        match resp {
            ImgBbResponse {
                success: true,
                data: Some(image),
                ..
            } => Ok(image),
            ImgBbResponse { error, .. } => Err(ImageHostError::Rejected(
                error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "no image in response".into()),
            )),
        }
    }
}
