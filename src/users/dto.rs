use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::User;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// `userIds` stays untyped until coercion so that bad entries can be dropped
/// individually instead of failing the whole body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatusRequest {
    pub user_ids: Option<Value>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    pub user_ids: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub message: String,
    pub users: Vec<User>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResponse {
    pub message: String,
    pub affected_rows: u64,
}
