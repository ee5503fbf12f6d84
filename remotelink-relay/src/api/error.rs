use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::RelayError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(RelayError::InvalidArgument(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            RelayError::InvalidArgument(_) | RelayError::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::PartialCascade { .. } | RelayError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let error_response = ErrorResponse {
            success: false,
            message: self.0.to_string(),
            error: Some(self.0.code().to_owned()),
        };

        (status, Json(error_response)).into_response()
    }
}
