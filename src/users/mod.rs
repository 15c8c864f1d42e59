mod dto;
pub mod handlers;
pub mod services;

pub use dto::{BulkDeleteRequest, BulkResponse, BulkStatusRequest, ListQuery, UserListResponse};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
