use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    /// Also used when the caller may not see the resource, so existence is never leaked.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{message}")]
    InvalidMessage {
        field: Option<&'static str>,
        message: String,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Storage error")]
    Storage(#[from] std::io::Error),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidMessage {
            field: None,
            message: message.into(),
        }
    }

    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::InvalidMessage {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidMessage { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                serde_json::json!({"error": "Internal server error"})
            }
            ApiError::Storage(e) => {
                tracing::error!("Blob storage error: {:?}", e);
                serde_json::json!({"error": "Internal server error"})
            }
            ApiError::InvalidMessage {
                field: Some(field),
                message,
            } => serde_json::json!({"error": message, "field": field}),
            other => serde_json::json!({"error": other.to_string()}),
        };
        (status, Json(body)).into_response()
    }
}
