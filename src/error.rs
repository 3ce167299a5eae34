use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::cache::CacheError;
use crate::cms::CmsError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("{0}")]
    AuthFailed(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("CMS error: {0}")]
    Cms(#[from] CmsError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::AuthRequired => StatusCode::UNAUTHORIZED,
            ServerError::AuthFailed(_) => StatusCode::UNAUTHORIZED,
            ServerError::InvalidSignature => StatusCode::UNAUTHORIZED,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Cms(CmsError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Cms(_) | ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Cache(_) | ServerError::Template(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to a client
    pub fn public_message(&self) -> String {
        match self {
            ServerError::Cms(CmsError::NotFound(what)) => format!("Not found: {}", what),
            ServerError::Cms(_) => "Upstream content service error".to_string(),
            ServerError::Upstream(_) => "Upstream service error".to_string(),
            ServerError::Cache(_) | ServerError::Template(_) | ServerError::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
        }

        (status, Json(serde_json::json!({ "error": self.public_message() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
