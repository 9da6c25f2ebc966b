use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::access::validation::validate_email;
use crate::auth::{RequireAdmin, TokenGenerator};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    CreateTokenResponse, CreateUserRequest, CreateUserTokenRequest, PaginationParams,
    TokenResponse,
};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::store::normalize_email;
use crate::types::User;

pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    validate_email(&req.email)?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        email: normalize_email(&req.email),
        created_at: Utc::now(),
    };

    match state.store.create_user(&user) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => {
            return Err(ApiError::conflict("A user with this email already exists"));
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create user");
            return Err(ApiError::internal("Failed to create user"));
        }
    }

    tracing::info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let users = state
        .store
        .list_users(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list users")?;

    let (users, next_cursor, has_more) =
        paginate(users, DEFAULT_PAGE_SIZE as usize, |u| u.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(users, next_cursor, has_more)))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(&id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

/// Deleting a user also removes their tokens, their memberships and every
/// pantry they own.
pub async fn delete_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if !state.store.delete_user(&id).api_err("Failed to delete user")? {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id = %id, "user deleted");
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_user_tokens(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(&id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    let tokens: Vec<TokenResponse> = state
        .store
        .list_user_tokens(&user.id)
        .api_err("Failed to list user tokens")?
        .into_iter()
        .map(TokenResponse::from)
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(tokens)))
}

pub async fn create_user_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateUserTokenRequest>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(&id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    let expires_at = match req.expires_in_seconds {
        Some(seconds) if seconds < 0 => {
            return Err(ApiError::bad_request(
                "expires_in_seconds cannot be negative",
            ));
        }
        Some(seconds) => Some(Utc::now() + Duration::seconds(seconds)),
        None => None,
    };

    let (token, raw_token) = TokenGenerator::new()
        .issue(state.store.as_ref(), Some(&user.id), expires_at)
        .api_err("Failed to create token")?;

    tracing::info!(user_id = %user.id, token_id = %token.id, "user token issued");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateTokenResponse {
            token: raw_token,
            metadata: token.into(),
        })),
    ))
}
