//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

/// Error returned by handlers; rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    Internal(tessera_core::Error),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<tessera_core::Error> for ApiError {
    fn from(err: tessera_core::Error) -> Self {
        use tessera_core::Error;
        match &err {
            Error::NotFound(_) | Error::ItemNotFound(_) | Error::BoardNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            Error::AlreadyExists(_) => ApiError::Conflict(err.to_string()),
            _ => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_of(err: tessera_core::Error) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_core_errors_map_to_status_codes() {
        use tessera_core::Error;
        assert_eq!(status_of(Error::ItemNotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(Error::BoardNotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(Error::InvalidInput("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(Error::AlreadyExists("edge".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(Error::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
