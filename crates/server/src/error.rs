use std::collections::BTreeMap;

use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{DbErr, validation::ValidationErrors};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("Operation failed: {message}")]
    OperationFailed {
        message: String,
        errors: Option<ValidationErrors>,
    },
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn task_not_found() -> Self {
        ApiError::NotFound("Task not found".to_string())
    }

    pub fn operation_failed(message: &str) -> Self {
        ApiError::OperationFailed {
            message: message.to_string(),
            errors: None,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "ValidationError"),
            ApiError::OperationFailed { .. } => (StatusCode::BAD_REQUEST, "OperationFailed"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed"),
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }

        let (message, errors): (String, Option<BTreeMap<String, Vec<String>>>) = match self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => (msg, None),
            ApiError::Validation(errors) => ("Validation failed".to_string(), Some(errors.into_map())),
            ApiError::OperationFailed { message, errors } => {
                (message, errors.map(ValidationErrors::into_map))
            }
            ApiError::MethodNotAllowed => ("Method Not Allowed".to_string(), None),
            ApiError::Database(DbErr::RecordNotFound(msg)) => (msg, None),
            ApiError::Database(_) | ApiError::Internal(_) => {
                ("Internal server error".to_string(), None)
            }
        };

        let response = match errors {
            Some(errors) => ApiResponse::<()>::error_with_fields(&message, errors),
            None => ApiResponse::<()>::error(&message),
        };
        (status_code, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::{Value, json};

    use super::*;

    async fn body_json(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn api_error_maps_to_expected_http_statuses() {
        assert_eq!(
            ApiError::task_not_found().into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Validation(ValidationErrors::new())
                .into_response()
                .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::operation_failed("Failed to delete task")
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::MethodNotAllowed.into_response().status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ApiError::Database(DbErr::RecordNotFound("Task not found".into()))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Database(DbErr::Custom("boom".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn validation_errors_are_listed_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "Title cannot be blank.");
        let (status, body) = body_json(ApiError::Validation(errors)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({
                "status": "error",
                "message": "Validation failed",
                "errors": { "title": ["Title cannot be blank."] }
            })
        );
    }

    #[tokio::test]
    async fn server_errors_hide_details() {
        let (_, body) = body_json(ApiError::Database(DbErr::Custom("secret dsn".into()))).await;
        assert_eq!(
            body,
            json!({ "status": "error", "message": "Internal server error" })
        );
    }

    #[tokio::test]
    async fn query_rejections_use_the_error_envelope() {
        #[derive(Debug, serde::Deserialize)]
        struct Paged {
            #[allow(dead_code)]
            page: u32,
        }

        let uri: axum::http::Uri = "/tasks?page=abc".parse().unwrap();
        let rejection = axum::extract::Query::<Paged>::try_from_uri(&uri).unwrap_err();
        let (status, body) = body_json(rejection.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("query string"));
    }
}
