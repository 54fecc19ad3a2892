use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::db::{InvalidObjectId, StoreError};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Store error during {operation} ({target}): {source}")]
    Store {
        operation: &'static str,
        target: String,
        #[source]
        source: StoreError,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    Internal,
}

/// How an error is presented: what the client sees and what gets logged.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub status: StatusCode,
    pub public_message: String,
    pub internal_detail: Option<String>,
}

pub const INTERNAL_MESSAGE: &str = "Internal server error";

impl AppError {
    pub fn classify(&self) -> ErrorReport {
        let (kind, status, public_message, internal_detail) = match self {
            AppError::Unauthorized => (
                ErrorKind::Auth,
                StatusCode::UNAUTHORIZED,
                self.to_string(),
                None,
            ),
            AppError::NotFound(msg) => (ErrorKind::NotFound, StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::BadRequest(msg) => {
                (ErrorKind::Validation, StatusCode::BAD_REQUEST, msg.clone(), None)
            }
            AppError::Validation(e) => (
                ErrorKind::Validation,
                StatusCode::BAD_REQUEST,
                validation_message(e),
                None,
            ),
            AppError::Store { .. } => (
                ErrorKind::Internal,
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_MESSAGE.to_string(),
                Some(self.to_string()),
            ),
            AppError::Internal(e) => (
                ErrorKind::Internal,
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_MESSAGE.to_string(),
                Some(format!("Internal error: {e:#}")),
            ),
        };

        ErrorReport {
            kind,
            status,
            public_message,
            internal_detail,
        }
    }

    pub fn store(operation: &'static str, target: impl ToString) -> impl FnOnce(StoreError) -> Self {
        let target = target.to_string();
        move |source| AppError::Store {
            operation,
            target,
            source,
        }
    }
}

fn validation_message(e: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = e
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let msgs: Vec<&str> = errors
                .iter()
                .filter_map(|err| err.message.as_ref().map(|m| m.as_ref()))
                .collect();
            if msgs.is_empty() {
                let codes: Vec<&str> = errors.iter().map(|err| err.code.as_ref()).collect();
                format!("{}: {}", field, codes.join(", "))
            } else {
                format!("{}: {}", field, msgs.join(", "))
            }
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let report = self.classify();

        if let Some(detail) = &report.internal_detail {
            tracing::error!("{}", detail);
        }

        (report.status, Json(json!({ "error": report.public_message }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<InvalidObjectId> for AppError {
    fn from(e: InvalidObjectId) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
