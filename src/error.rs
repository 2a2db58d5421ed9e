use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;
use std::fmt;

use crate::data::{Profile, RepositoryError};
use crate::templates;

/// Structured error type for everything a view can reject a request with
///
/// Every variant is shown to the user as the generic message page, so the
/// `title` and `message` are user-facing text.
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Username shown in the page header of the message page
    #[serde(skip)]
    pub viewer: Option<String>,
}

/// Error codes for categorizing different error types
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Lookup errors
    NotFound,

    // Membership and creation rules
    PreconditionFailed,
    InsufficientPoints,
    PermissionDenied,

    // Internal errors
    Storage,
    Template,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::PreconditionFailed => StatusCode::CONFLICT,
            ErrorCode::InsufficientPoints | ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorCode::Storage | ErrorCode::Template => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(details) = &self.details {
            write!(f, "{:?}: {} - {}", self.code, self.message, details)
        } else {
            write!(f, "{:?}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for AppError {}

// Convenience constructors
impl AppError {
    pub fn new(code: ErrorCode, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            title: title.into(),
            message: message.into(),
            details: None,
            viewer: None,
        }
    }

    /// Unknown organization key
    pub fn organization_not_found(key: &str) -> Self {
        let message = if key.is_empty() {
            "Could not find such organization.".to_string()
        } else {
            format!("Could not find an organization with the key \"{}\".", key)
        };
        Self::new(ErrorCode::NotFound, "No such organization", message)
    }

    pub fn precondition_failed(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PreconditionFailed, title, message)
    }

    pub fn insufficient_points(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientPoints, title, message)
    }

    pub fn permission_denied(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, title, message)
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::Storage,
            "Internal error",
            "The request could not be completed.",
        )
        .with_details(msg)
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::Template,
            "Internal error",
            "The page could not be rendered.",
        )
        .with_details(msg)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Render the message page for the logged-in `viewer`
    pub fn for_viewer(mut self, viewer: Option<&Profile>) -> Self {
        if self.viewer.is_none() {
            self.viewer = viewer.map(|p| p.username.clone());
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = ?self.code, details = ?self.details, "{}", self.message);
        }

        // Details stay in the log; the page only carries the user-facing text
        match templates::generic_message(&self.title, &self.message, self.viewer.as_deref()) {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "failed to render message page");
                (status, format!("{}: {}", self.title, self.message)).into_response()
            }
        }
    }
}

// Conversions from common error types
impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        Self::template(format!("{:?}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_includes_key() {
        let err = AppError::organization_not_found("abc");
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.title, "No such organization");
        assert_eq!(err.message, "Could not find an organization with the key \"abc\".");
    }

    #[test]
    fn test_not_found_message_without_key() {
        let err = AppError::organization_not_found("");
        assert_eq!(err.message, "Could not find such organization.");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::PermissionDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::PreconditionFailed.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::InsufficientPoints.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::Storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::Template.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_display_with_details() {
        let err = AppError::storage("disk full");
        assert_eq!(
            err.to_string(),
            "Storage: The request could not be completed. - disk full"
        );
    }
}
