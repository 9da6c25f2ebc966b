use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::{Error, Result as StoreResult};

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }
}

/// Paginated response for list endpoints
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T: Serialize> PaginatedResponse<T> {
    #[must_use]
    pub fn new(data: Vec<T>, next_cursor: Option<String>, has_more: bool) -> Self {
        Self {
            data,
            next_cursor,
            has_more,
        }
    }
}

/// API error that converts to a proper HTTP response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Like `From<Error>`, but reports denials and missing rows as a missing
    /// `what`. A requester without access cannot tell the two apart.
    #[must_use]
    pub fn hiding(err: Error, what: &'static str) -> Self {
        match err {
            Error::NotAuthorized | Error::NotFound => Self::not_found(format!("{what} not found")),
            other => Self::from(other),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(message) => Self::bad_request(message),
            Error::InvalidTokenFormat => Self::bad_request("Invalid token format"),
            Error::InvalidTarget(message) => Self::bad_request(message),
            Error::UserNotFound => Self::not_found("User not found"),
            Error::NotAuthorized | Error::NotFound => Self::not_found("Pantry not found"),
            Error::AlreadyOwner => Self::conflict("User already owns this pantry"),
            Error::AlreadyExists => Self::conflict("Already exists"),
            Error::Timeout(op) => {
                tracing::warn!(op, "request failed on store timeout");
                Self::new(StatusCode::GATEWAY_TIMEOUT, "Request timed out")
            }
            other => {
                tracing::error!(error = %other, "request failed");
                Self::internal("Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "data": null, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// Helper to paginate a slice and determine if there are more results
pub fn paginate<T, F>(items: Vec<T>, limit: usize, get_cursor: F) -> (Vec<T>, Option<String>, bool)
where
    F: Fn(&T) -> String,
{
    let has_more = items.len() > limit;
    let items: Vec<T> = items.into_iter().take(limit).collect();
    let next_cursor = if has_more {
        items.last().map(&get_cursor)
    } else {
        None
    };
    (items, next_cursor, has_more)
}

pub const DEFAULT_PAGE_SIZE: i32 = 50;

/// Extension trait for converting store results to API errors with a custom message.
pub trait StoreResultExt<T> {
    fn api_err(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn api_err(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| {
            tracing::error!(error = %e, "{message}");
            ApiError::internal(message)
        })
    }
}

/// Extension for Option types from store operations.
pub trait StoreOptionExt<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreOptionExt<T> for Option<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_and_absence_look_the_same() {
        let denied = ApiError::from(Error::NotAuthorized);
        let missing = ApiError::from(Error::NotFound);
        assert_eq!(denied.status, StatusCode::NOT_FOUND);
        assert_eq!(denied.status, missing.status);
        assert_eq!(denied.message, missing.message);

        let hidden = ApiError::hiding(Error::NotAuthorized, "Item");
        assert_eq!(hidden.status, StatusCode::NOT_FOUND);
        assert_eq!(hidden.message, "Item not found");
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidTarget("owner".into()), StatusCode::BAD_REQUEST),
            (Error::UserNotFound, StatusCode::NOT_FOUND),
            (Error::AlreadyOwner, StatusCode::CONFLICT),
            (Error::Timeout("get_pantry"), StatusCode::GATEWAY_TIMEOUT),
            (Error::Persistence("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_internal_errors_do_not_leak_details() {
        let err = ApiError::from(Error::Persistence("disk I/O error at /var/db".into()));
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn test_paginate() {
        let (items, cursor, more) = paginate(vec![1, 2, 3], 2, |n| n.to_string());
        assert_eq!(items, vec![1, 2]);
        assert_eq!(cursor.as_deref(), Some("2"));
        assert!(more);

        let (items, cursor, more) = paginate(vec![1, 2], 2, |n| n.to_string());
        assert_eq!(items.len(), 2);
        assert_eq!(cursor, None);
        assert!(!more);
    }
}
