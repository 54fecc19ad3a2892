use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ImageUploadRequest {
    /// Base64-encoded image data or a public image URL.
    #[validate(length(min = 1, message = "image is required"))]
    pub image: String,
    #[validate(length(max = 200))]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
    pub display_url: String,
    pub delete_url: Option<String>,
}
