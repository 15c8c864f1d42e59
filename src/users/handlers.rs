use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{BulkDeleteRequest, BulkResponse, BulkStatusRequest, ListQuery, UserListResponse},
    services,
};
use crate::{auth::extractors::AuthUser, error::AppResult, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).delete(delete_users))
        .route("/users/status", patch(update_status))
}

#[instrument(skip(state, caller), fields(caller_id = caller.0.id))]
pub async fn list_users(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<UserListResponse>> {
    let res = services::list_users(state.store.as_ref(), query).await?;
    Ok(Json(res))
}

#[instrument(skip(state, caller, payload), fields(caller_id = caller.0.id))]
pub async fn update_status(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<BulkStatusRequest>, JsonRejection>,
) -> AppResult<Json<BulkResponse>> {
    let Json(payload) = payload?;
    let res = services::update_status(state.store.as_ref(), payload).await?;
    Ok(Json(res))
}

#[instrument(skip(state, caller, payload), fields(caller_id = caller.0.id))]
pub async fn delete_users(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> AppResult<Json<BulkResponse>> {
    let Json(payload) = payload?;
    let res = services::delete_users(state.store.as_ref(), payload).await?;
    Ok(Json(res))
}
