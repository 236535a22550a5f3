use crate::counter::CounterError;
use crate::models::ErrorBody;
use axum::{http::StatusCode, Json};
use tracing::{debug, error};

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "Method not allowed".to_string(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<CounterError> for AppError {
    fn from(err: CounterError) -> Self {
        match &err {
            CounterError::InvalidRequest(message) => Self::bad_request(message.clone()),
            CounterError::LimitExceeded { .. } => {
                debug!("{err}");
                Self::forbidden(err.to_string())
            }
            CounterError::ServiceUnavailable(_) => {
                error!("counter store failed: {err}");
                Self::internal(&err)
            }
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            Json(ErrorBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}
