use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::CreatePantryRequest;
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_pantries(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let listing = state.resolver.list_pantries(&auth.user.id).await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(listing)))
}

pub async fn create_pantry(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePantryRequest>,
) -> impl IntoResponse {
    req.hints.log_ignored("create_pantry");

    let pantry = state
        .resolver
        .create_pantry(&auth.user.id, &req.name, req.description.as_deref())
        .await?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(pantry))))
}

pub async fn get_pantry(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let view = state.resolver.get_pantry(&auth.user.id, &id).await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(view)))
}

pub async fn delete_pantry(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.resolver.delete_pantry(&auth.user.id, &id).await?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
