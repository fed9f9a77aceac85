use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub details: Option<HashMap<String, Vec<String>>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub enum AppError {
    ValidationError(HashMap<String, Vec<String>>),
    NotFound(String),
    Conflict(String),
    BadRequest(String),
    PayloadTooLarge(String),
    InternalServerError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message, details) = match self {
            AppError::ValidationError(errors) => (
                "VALIDATION_ERROR",
                "Validation failed".to_string(),
                Some(errors),
            ),
            AppError::NotFound(msg) => ("NOT_FOUND", msg, None),
            AppError::Conflict(msg) => ("CONFLICT", msg, None),
            AppError::BadRequest(msg) => ("BAD_REQUEST", msg, None),
            AppError::PayloadTooLarge(msg) => ("PAYLOAD_TOO_LARGE", msg, None),
            AppError::InternalServerError(msg) => ("INTERNAL_SERVER_ERROR", msg, None),
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
            timestamp: Utc::now(),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut error_map = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|error| {
                    error
                        .message
                        .as_ref()
                        .map(|msg| msg.to_string())
                        .unwrap_or_else(|| format!("Invalid value for field '{}'", field))
                })
                .collect();
            error_map.insert(field.to_string(), messages);
        }

        AppError::ValidationError(error_map)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    AppError::Conflict("Resource already exists".to_string())
                } else {
                    AppError::InternalServerError("Database error occurred".to_string())
                }
            }
            _ => AppError::InternalServerError("Database error occurred".to_string()),
        }
    }
}
