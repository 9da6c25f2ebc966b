mod items;
mod members;
mod pantries;

use std::sync::Arc;

use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::response::ApiResponse;

async fn current_user(auth: RequireUser) -> impl IntoResponse {
    Json(ApiResponse::success(auth.user))
}

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user", get(current_user))
        // Pantries
        .route("/pantries", get(pantries::list_pantries))
        .route("/pantries", post(pantries::create_pantry))
        .route("/pantries/{id}", get(pantries::get_pantry))
        .route("/pantries/{id}", delete(pantries::delete_pantry))
        // Members
        .route("/pantries/{id}/members", get(members::list_members))
        .route("/pantries/{id}/members", post(members::invite_member))
        .route(
            "/pantries/{id}/members/{user_id}",
            patch(members::change_member_role),
        )
        .route(
            "/pantries/{id}/members/{user_id}",
            delete(members::remove_member),
        )
        // Items
        .route("/pantries/{id}/items", get(items::list_items))
        .route("/pantries/{id}/items", post(items::add_item))
        .route("/pantries/{id}/items/{item_id}", patch(items::update_item))
        .route("/pantries/{id}/items/{item_id}", delete(items::delete_item))
}
