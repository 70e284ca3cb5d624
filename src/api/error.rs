use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::errors::AppError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

/// Maps the domain error taxonomy onto HTTP status codes per the error
/// handling design: validation -> 400, insufficient data -> 422, upstream
/// failures -> 502, everything else -> 500.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DataInsufficient(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::ConstraintViolation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request() {
        let response = AppError::validation("bad input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn data_insufficient_maps_to_unprocessable_entity() {
        let response = AppError::data_insufficient("too few observations").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn internal_errors_map_to_500() {
        let response = AppError::internal("boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
