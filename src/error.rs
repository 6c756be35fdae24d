use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::calculator::ValidationReport;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {}", .0.summary())]
    Validation(ValidationReport),

    #[error("Sign in required")]
    Unauthorized,

    #[error("Signed-in identity is not an operator")]
    Forbidden,

    /// A store operation failed; carries the notification shown to the user.
    #[error("{0}")]
    Failed(&'static str),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not found",
            AppError::BadRequest(_) => "bad request",
            AppError::Validation(_) => "validation failed",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::Http(_) => "upstream error",
            _ => "internal server error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(report) => json!({
                "error": self.kind(),
                "message": report.summary(),
                "issues": report.issues,
            }),
            // Internal details stay in the logs.
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Io(_)
            | AppError::Config(_)
            | AppError::CorruptRecord { .. } => json!({
                "error": self.kind(),
                "message": "internal server error",
            }),
            _ => json!({ "error": self.kind(), "message": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
