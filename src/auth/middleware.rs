use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{
    TokenValidationError, ValidatedToken, extract_token_from_header, validate_token,
};
use crate::error::ErrorKind;
use crate::server::AppState;
use crate::types::{Token, User};

/// Extractor that requires an admin token.
pub struct RequireAdmin(pub Token);

/// Extractor that requires a user token. This is the request's session: the
/// user id handed to the resolver comes from here and nowhere else.
pub struct RequireUser {
    pub token: Token,
    pub user: User,
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    NotAdmin,
    NotUser,
    Timeout,
    InternalError,
}

impl From<TokenValidationError> for AuthError {
    fn from(e: TokenValidationError) -> Self {
        match e {
            TokenValidationError::InvalidScheme => AuthError::InvalidScheme,
            TokenValidationError::InvalidToken => AuthError::InvalidToken,
            TokenValidationError::TokenExpired => AuthError::TokenExpired,
            TokenValidationError::InternalError => AuthError::InternalError,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required"),
            AuthError::NotUser => (
                StatusCode::FORBIDDEN,
                "User token required for this operation",
            ),
            AuthError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Request timed out"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });
        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"pantry-raider\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = authenticate(parts, state).await?.token;

        if !token.is_admin {
            return Err(AuthError::NotAdmin);
        }

        Ok(RequireAdmin(token))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let validated = authenticate(parts, state).await?;

        if validated.token.is_admin {
            return Err(AuthError::NotUser);
        }

        // A token whose user was deleted is as good as revoked.
        let user = validated.user.ok_or(AuthError::InvalidToken)?;

        Ok(RequireUser {
            token: validated.token,
            user,
        })
    }
}

/// Validates the request's token on the blocking pool, under the same
/// deadline as pantry operations.
async fn authenticate(
    parts: &Parts,
    state: &Arc<AppState>,
) -> Result<ValidatedToken, AuthError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let raw_token = extract_token_from_header(auth_header)?.ok_or(AuthError::MissingAuth)?;

    let validated = state
        .resolver
        .call("validate_token", move |store| {
            Ok(validate_token(store, &raw_token))
        })
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::Timeout => AuthError::Timeout,
            _ => {
                tracing::error!(error = %e, "token validation failed");
                AuthError::InternalError
            }
        })??;

    Ok(validated)
}
