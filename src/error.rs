use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;

use crate::forms::FieldErrors;
use crate::policy::Denial;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Invalid input")]
    Validation(FieldErrors),

    #[error("This {field} is used already")]
    Duplicate { field: &'static str },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Denied: {0}")]
    Denied(Denial),

    #[error("Incorrect answers")]
    VerificationFailed,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("File format not allowed: {0}")]
    UploadRejected(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        AppError::Denied(denial)
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

fn error_body(status: StatusCode, message: String) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "code": status.as_u16(),
            "message": message,
        }
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                error_body(StatusCode::NOT_FOUND, self.to_string()),
            ),
            AppError::Validation(errors) => {
                let status = StatusCode::UNPROCESSABLE_ENTITY;
                let mut body = error_body(status, self.to_string());
                body["error"]["fields"] = serde_json::json!(errors);
                (status, body)
            }
            AppError::Duplicate { field } => {
                let status = StatusCode::CONFLICT;
                let mut body = error_body(status, self.to_string());
                body["error"]["field"] = serde_json::json!(field);
                (status, body)
            }
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                error_body(StatusCode::UNAUTHORIZED, self.to_string()),
            ),
            AppError::Denied(denial) => {
                return Redirect::to(denial.entry_point()).into_response();
            }
            AppError::VerificationFailed => (
                StatusCode::FORBIDDEN,
                error_body(StatusCode::FORBIDDEN, self.to_string()),
            ),
            AppError::InvalidResetToken => {
                return Redirect::to("/reset_password_request").into_response();
            }
            AppError::UploadRejected(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                error_body(StatusCode::UNSUPPORTED_MEDIA_TYPE, self.to_string()),
            ),
            AppError::Database(_) | AppError::Pool(_) | AppError::Io(_) | AppError::Internal(_) => {
                tracing::error!("{}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    ),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    fn response_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(response_status(AppError::NotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn duplicate_returns_409() {
        assert_eq!(
            response_status(AppError::Duplicate { field: "username" }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn validation_returns_422() {
        let mut errors = FieldErrors::default();
        errors.add("body", "This field is required.");
        assert_eq!(
            response_status(AppError::Validation(errors)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn denials_redirect_to_entry_points() {
        let cases = [
            (Denial::Unauthenticated, "/login"),
            (Denial::Unverified, "/verification"),
            (Denial::NotOwner, "/discussion"),
            (Denial::AlreadyAuthenticated, "/"),
        ];
        for (denial, location) in cases {
            let response = AppError::Denied(denial).into_response();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.headers()[header::LOCATION], location);
        }
    }

    #[test]
    fn internal_is_masked_500() {
        assert_eq!(
            response_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
