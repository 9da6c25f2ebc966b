use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;

use super::{TokenGenerator, parse_token};
use crate::store::Store;
use crate::types::{Token, User};

#[derive(Debug, PartialEq, Eq)]
pub enum TokenValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

pub struct ValidatedToken {
    pub token: Token,
    pub user: Option<User>,
}

/// Extracts a token from a Basic auth header of the form
/// `Basic base64(x-token:<token>)`.
pub fn extract_basic_auth_token(header: &str) -> Option<String> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (username, password) = credentials.split_once(':')?;

    if username != "x-token" {
        return None;
    }

    Some(password.to_string())
}

/// Pulls the raw token out of an Authorization header (Bearer or Basic).
/// `Ok(None)` means no header was sent.
pub fn extract_token_from_header(
    auth_header: Option<&str>,
) -> Result<Option<String>, TokenValidationError> {
    let Some(header) = auth_header else {
        return Ok(None);
    };

    if let Some(token) = header.strip_prefix("Bearer ") {
        return Ok(Some(token.trim().to_string()));
    }
    if header.starts_with("Basic ") {
        return extract_basic_auth_token(header)
            .ok_or(TokenValidationError::InvalidToken)
            .map(Some);
    }
    Err(TokenValidationError::InvalidScheme)
}

/// Checks a raw token against the store and loads its user, if any.
pub fn validate_token(
    store: &dyn Store,
    raw_token: &str,
) -> Result<ValidatedToken, TokenValidationError> {
    let (lookup, _secret) =
        parse_token(raw_token).map_err(|_| TokenValidationError::InvalidToken)?;

    let token = store
        .get_token_by_lookup(&lookup)
        .map_err(|e| {
            tracing::error!(error = %e, "token lookup failed");
            TokenValidationError::InternalError
        })?
        .ok_or(TokenValidationError::InvalidToken)?;

    let generator = TokenGenerator::new();
    if !generator
        .verify(raw_token, &token.token_hash)
        .map_err(|_| TokenValidationError::InternalError)?
    {
        return Err(TokenValidationError::InvalidToken);
    }

    if token.expires_at.is_some_and(|expires_at| expires_at < Utc::now()) {
        return Err(TokenValidationError::TokenExpired);
    }

    let user = match &token.user_id {
        Some(user_id) => store
            .get_user(user_id)
            .map_err(|_| TokenValidationError::InternalError)?,
        None => None,
    };

    if let Err(e) = store.update_token_last_used(&token.id) {
        tracing::warn!("Failed to update token last_used_at: {e}");
    }

    Ok(ValidatedToken { token, user })
}
