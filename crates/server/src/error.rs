use crate::response::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use core_types::CoreError;

/// Handler error type, `?`-propagated the same way the teacher's route
/// modules propagate `anyhow::anyhow!(...)` into `AppError` (see
/// `symbol_routes.rs`). Maps the closed error-kind set from spec §7 onto
/// HTTP status codes; everything else becomes a 500.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Overload { retry_after_s: u64 },
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AppError::Validation(msg),
            CoreError::Overload { retry_after_s } => AppError::Overload { retry_after_s },
            other => AppError::Internal(anyhow::anyhow!(other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, retry_after_s) = match self {
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg, None),
            AppError::Overload { retry_after_s } => {
                (StatusCode::SERVICE_UNAVAILABLE, "overloaded".to_string(), Some(retry_after_s))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string(), None)
            }
        };

        let body: ApiResponse<()> = ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(retry_after_s) = retry_after_s {
            response
                .headers_mut()
                .insert("Retry-After", retry_after_s.to_string().parse().unwrap());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_422() {
        let response = AppError::Validation("query must not be empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn overload_error_maps_to_503_with_retry_after() {
        let response = AppError::Overload { retry_after_s: 30 }.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "30");
    }

    #[test]
    fn core_error_overload_round_trips_through_from() {
        let core_err = CoreError::Overload { retry_after_s: 5 };
        let app_err: AppError = core_err.into();
        assert!(matches!(app_err, AppError::Overload { retry_after_s: 5 }));
    }

    #[test]
    fn core_error_validation_round_trips_through_from() {
        let core_err = CoreError::ValidationError("bad input".to_string());
        let app_err: AppError = core_err.into();
        assert!(matches!(app_err, AppError::Validation(msg) if msg == "bad input"));
    }

    #[test]
    fn unmapped_core_error_becomes_internal_500() {
        let core_err = CoreError::ParseError("malformed".to_string());
        let app_err: AppError = core_err.into();
        let response = app_err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
