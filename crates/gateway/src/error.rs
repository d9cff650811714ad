use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use backstage_auth::AuthError;
use backstage_chats::{ChatError, ErrorKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(error: ChatError) -> Self {
        match error.kind() {
            ErrorKind::NotFound => {
                debug!(error = %error, "chat resource not found");
                Self::not_found(error.to_string())
            }
            ErrorKind::Forbidden => {
                debug!(error = %error, "chat access denied");
                Self::forbidden(error.to_string())
            }
            ErrorKind::InvalidInput => Self::bad_request(error.to_string()),
            ErrorKind::StoreUnavailable => {
                warn!(error = %error, "message store unavailable");
                Self::service_unavailable("message store unavailable, retry later")
            }
            ErrorKind::Internal => {
                error!(error = ?error, "chat error");
                Self::internal_server_error("internal server error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        if error.is_authentication_failure() {
            debug!(error = %error, "authentication failed");
            return Self::unauthorized(error.to_string());
        }

        error!(error = ?error, "auth error");
        match error {
            AuthError::IdentityStore(_) => Self::service_unavailable("identity store unavailable"),
            _ => Self::internal_server_error("internal server error"),
        }
    }
}
