use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nsi_aura_core::TransitionError;
use serde_json::json;
use thiserror::Error;

/// Error categories and their HTTP propagation policy, per the error
/// handling design: transport/SOAP-fault failures are logged on the
/// reservation and reported as 502, transition-not-allowed as 500,
/// validation as 422, everything else as 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("reservation {0} not found")]
    ReservationNotFound(i64),

    #[error("upstream NSI provider error: {0}")]
    Upstream(#[from] nsi_aura_codec::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Transition(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ReservationNotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        log::warn!("request failed: {self}");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
