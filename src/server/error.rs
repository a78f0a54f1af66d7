//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::ForgeError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Training did not finish within {0} seconds")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Forge(#[from] ForgeError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Forge(e) => forge_status(e),
        }
    }
}

fn forge_status(err: &ForgeError) -> StatusCode {
    match err {
        ForgeError::InvalidTask(_)
        | ForgeError::UnsupportedAlgorithm { .. }
        | ForgeError::FeatureCountMismatch { .. }
        | ForgeError::InvalidInputFormat(_)
        | ForgeError::InvalidFeatureValue { .. } => StatusCode::BAD_REQUEST,
        ForgeError::UnknownColumn(_) => StatusCode::NOT_FOUND,
        ForgeError::ModelNotTrained => StatusCode::CONFLICT,
        ForgeError::NoFeatures(_)
        | ForgeError::NonNumericFeature { .. }
        | ForgeError::MissingValues { .. }
        | ForgeError::NonFiniteValues { .. }
        | ForgeError::ContinuousTarget(_)
        | ForgeError::InsufficientClassSamples(_)
        | ForgeError::InsufficientSamples { .. }
        | ForgeError::DataError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ForgeError::UnknownClassCode(_)
        | ForgeError::ShapeError { .. }
        | ForgeError::ModelNotFitted
        | ForgeError::ComputationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                "An internal error occurred".to_string()
            }
            ServerError::Forge(e) if status.is_server_error() => {
                tracing::error!(kind = e.kind(), detail = %e, "Model error");
                e.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_per_kind() {
        let cases = [
            (ServerError::from(ForgeError::InvalidTask("x".into())), StatusCode::BAD_REQUEST),
            (ServerError::from(ForgeError::UnknownColumn("x".into())), StatusCode::NOT_FOUND),
            (ServerError::from(ForgeError::ModelNotTrained), StatusCode::CONFLICT),
            (
                ServerError::from(ForgeError::InsufficientClassSamples("x".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ServerError::from(ForgeError::NonFiniteValues { column: "x".into(), count: 1 }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ServerError::from(ForgeError::ModelNotFitted), StatusCode::INTERNAL_SERVER_ERROR),
            (ServerError::Conflict("Please upload CSV first".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{}", err);
        }
    }

    #[test]
    fn test_forge_message_is_passed_through() {
        let err = ServerError::from(ForgeError::ModelNotTrained);
        assert_eq!(err.to_string(), "Model not trained yet");
    }
}
