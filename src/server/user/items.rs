use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::access::ItemFilter;
use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{AddItemRequest, UpdateItemRequest};
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_items(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(filter): Query<ItemFilter>,
) -> impl IntoResponse {
    let listing = state
        .resolver
        .list_items(&auth.user.id, &id, &filter)
        .await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(listing)))
}

pub async fn add_item(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> impl IntoResponse {
    req.hints.log_ignored("add_item");

    let item = state
        .resolver
        .add_item(&auth.user.id, &id, req.item)
        .await?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(item))))
}

pub async fn update_item(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((id, item_id)): Path<(String, String)>,
    Json(req): Json<UpdateItemRequest>,
) -> impl IntoResponse {
    req.hints.log_ignored("update_item");

    let item = state
        .resolver
        .update_item(&auth.user.id, &id, &item_id, req.update)
        .await
        .map_err(|e| ApiError::hiding(e, "Item"))?;

    Ok::<_, ApiError>(Json(ApiResponse::success(item)))
}

pub async fn delete_item(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((id, item_id)): Path<(String, String)>,
) -> impl IntoResponse {
    state
        .resolver
        .delete_item(&auth.user.id, &id, &item_id)
        .await
        .map_err(|e| ApiError::hiding(e, "Item"))?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
