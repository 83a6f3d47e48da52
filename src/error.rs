use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use thiserror::Error;
use tower_sessions::Session;

use crate::{
    response::{ApiResponse, Meta},
    services::email_service::EmailError,
    session::{FlashLevel, push_flash},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid email or password!")]
    InvalidCredentials,

    #[error("User not found! Please register first.")]
    UnknownAccount,

    #[error("Passwords do not match!")]
    PasswordMismatch,

    #[error("Email already registered!")]
    DuplicateRegistration,

    #[error("Your cart is empty.")]
    EmptyCart,

    #[error("Not enough stock for {0}.")]
    InsufficientStock(String),

    #[error("Item not found.")]
    ItemNotFound,

    #[error("Session expired! Please login again.")]
    SessionExpired,

    #[error("OTP expired! Please login again.")]
    OtpExpired,

    #[error("Invalid OTP! Please try again.")]
    OtpInvalid,

    #[error("Error sending email: {0}")]
    EmailDeliveryFailure(#[from] EmailError),

    #[error("You are not authorized to access that page.")]
    NotAuthorized,

    #[error("Not Found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Session error")]
    SessionError(#[from] tower_sessions::session::Error),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl AppError {
    /// Errors caused by the visitor's input or state, as opposed to store or
    /// infrastructure failures.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            AppError::DbError(_)
                | AppError::OrmError(_)
                | AppError::SessionError(_)
                | AppError::Internal(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials
            | AppError::UnknownAccount
            | AppError::SessionExpired
            | AppError::OtpExpired
            | AppError::OtpInvalid => StatusCode::UNAUTHORIZED,
            AppError::NotAuthorized => StatusCode::FORBIDDEN,
            AppError::DuplicateRegistration | AppError::InsufficientStock(_) => {
                StatusCode::CONFLICT
            }
            AppError::PasswordMismatch | AppError::EmptyCart | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::ItemNotFound | AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::EmailDeliveryFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::DbError(_)
            | AppError::OrmError(_)
            | AppError::SessionError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Turn a user-facing error into a flash message plus a redirect to `to`.
    /// Infrastructure errors fall through to the generic error response.
    pub async fn flash_redirect(self, session: &Session, to: &str) -> Response {
        if !self.is_user_facing() {
            return self.into_response();
        }

        let level = match &self {
            AppError::EmailDeliveryFailure(_) => FlashLevel::Warning,
            _ => FlashLevel::Error,
        };
        tracing::debug!(error = %self, redirect = %to, "request rejected");
        if let Err(err) = push_flash(session, level, self.to_string()).await {
            tracing::warn!(error = %err, "failed to store flash message");
        }
        Redirect::to(to).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if !self.is_user_facing() {
            tracing::error!(error = ?self, "request failed");
        }

        let message = self.to_string();
        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
            messages: Vec::new(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// True when a database error is a unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_errors_are_not_user_facing() {
        assert!(!AppError::Internal(anyhow::anyhow!("boom")).is_user_facing());
        assert!(!AppError::DbError(sqlx::Error::RowNotFound).is_user_facing());
        assert!(AppError::OtpInvalid.is_user_facing());
        assert!(AppError::EmptyCart.is_user_facing());
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            AppError::NotAuthorized.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::ItemNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::OtpExpired.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("secret detail"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::Internal(anyhow::anyhow!("connection string leaked"));
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[test]
    fn user_messages_match_flow_wording() {
        assert_eq!(
            AppError::OtpExpired.to_string(),
            "OTP expired! Please login again."
        );
        assert_eq!(
            AppError::DuplicateRegistration.to_string(),
            "Email already registered!"
        );
    }
}
