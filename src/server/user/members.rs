use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{ChangeRoleRequest, InviteMemberRequest};
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_members(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let members = state.resolver.list_members(&auth.user.id, &id).await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(members)))
}

/// 201 when a membership was created, 200 when an existing one was updated.
pub async fn invite_member(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<InviteMemberRequest>,
) -> impl IntoResponse {
    req.hints.log_ignored("invite_member");

    let result = state
        .resolver
        .invite_member(&auth.user.id, &id, &req.email, req.role)
        .await?;

    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok::<_, ApiError>((status, Json(ApiResponse::success(result))))
}

pub async fn change_member_role(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((id, user_id)): Path<(String, String)>,
    Json(req): Json<ChangeRoleRequest>,
) -> impl IntoResponse {
    req.hints.log_ignored("change_member_role");

    state
        .resolver
        .change_member_role(&auth.user.id, &id, &user_id, req.role)
        .await
        .map_err(|e| ApiError::hiding(e, "Member"))?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn remove_member(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((id, user_id)): Path<(String, String)>,
) -> impl IntoResponse {
    state
        .resolver
        .remove_member(&auth.user.id, &id, &user_id)
        .await?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
