use serde_json::Value;
use tracing::{info, instrument, warn};

use super::dto::{BulkDeleteRequest, BulkResponse, BulkStatusRequest, ListQuery, UserListResponse};
use crate::{
    error::{AppError, AppResult},
    store::{abort, SortSpec, UserStatus, UserStore},
};

pub const NO_USERS_MATCHED: &str = "No users found for the given ids";

#[instrument(skip(store))]
pub async fn list_users(store: &dyn UserStore, query: ListQuery) -> AppResult<UserListResponse> {
    let sort = SortSpec::resolve(query.sort_by.as_deref(), query.sort_order.as_deref());
    let users = store.list_all(sort).await?;
    Ok(UserListResponse {
        message: "Users retrieved successfully".into(),
        count: users.len(),
        users,
    })
}

/// Zero matched rows is reported as not found, but the transaction is still
/// committed.
#[instrument(skip(store))]
pub async fn update_status(store: &dyn UserStore, payload: BulkStatusRequest) -> AppResult<BulkResponse> {
    let raw_ids = id_list(payload.user_ids.as_ref())?;
    let status = payload
        .status
        .as_deref()
        .and_then(|s| s.parse::<UserStatus>().ok())
        .ok_or_else(|| AppError::Validation("Status must be one of: active, blocked".into()))?;
    let ids = coerce_ids(raw_ids)?;

    let mut tx = store.begin().await?;
    let updated = tx.update_status_bulk(&ids, status).await;
    let affected = match updated {
        Ok(n) => n,
        Err(e) => return Err(abort(tx, e.into()).await),
    };
    tx.commit().await?;

    if affected == 0 {
        warn!(?ids, "status update matched no users");
        return Err(AppError::NotFound(NO_USERS_MATCHED.into()));
    }

    info!(affected, %status, "user status updated");
    Ok(BulkResponse {
        message: format!("{} user(s) updated to {}", affected, status),
        affected_rows: affected,
    })
}

/// Zero matched rows rolls the transaction back.
#[instrument(skip(store))]
pub async fn delete_users(store: &dyn UserStore, payload: BulkDeleteRequest) -> AppResult<BulkResponse> {
    let ids = coerce_ids(id_list(payload.user_ids.as_ref())?)?;

    let mut tx = store.begin().await?;
    let deleted = tx.delete_bulk(&ids).await;
    let affected = match deleted {
        Ok(0) => {
            warn!(?ids, "delete matched no users");
            return Err(abort(tx, AppError::NotFound(NO_USERS_MATCHED.into())).await);
        }
        Ok(n) => n,
        Err(e) => return Err(abort(tx, e.into()).await),
    };
    tx.commit().await?;

    info!(affected, "users deleted");
    Ok(BulkResponse {
        message: format!("{} user(s) deleted", affected),
        affected_rows: affected,
    })
}

fn id_list(raw: Option<&Value>) -> AppResult<&[Value]> {
    match raw {
        Some(Value::Array(items)) if !items.is_empty() => Ok(items),
        _ => Err(AppError::Validation("userIds must be a non-empty array".into())),
    }
}

/// Keeps entries that denote a positive integer, in first-seen order, once each.
fn coerce_ids(raw: &[Value]) -> AppResult<Vec<i64>> {
    let mut ids: Vec<i64> = Vec::with_capacity(raw.len());
    for id in raw.iter().filter_map(positive_id) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(AppError::Validation("No valid ids".into()));
    }
    Ok(ids)
}

fn positive_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    (id > 0).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryUserStore, NewUser, SortField, UserStore};
    use serde_json::json;

    async fn seed(store: &MemoryUserStore, emails: &[&str]) -> Vec<i64> {
        let mut tx = store.begin().await.unwrap();
        let mut ids = Vec::new();
        for email in emails {
            let id = tx
                .insert(&NewUser {
                    email: email.to_string(),
                    password_digest: "digest".into(),
                    first_name: email.to_string(),
                    last_name: "Doe".into(),
                    job_title: None,
                    company: None,
                })
                .await
                .unwrap();
            ids.push(id);
        }
        tx.commit().await.unwrap();
        ids
    }

    #[test]
    fn coercion_keeps_positive_integers_only() {
        let raw = json!([1, "2", " 3 ", 0, -4, "x", 5.0, 6.5, null, true, 1]);
        let ids = coerce_ids(raw.as_array().unwrap()).unwrap();
        assert_eq!(ids, vec![1, 2, 3, 5]);
    }

    #[test]
    fn coercion_with_nothing_left_is_rejected() {
        let raw = json!(["a", 0, -1]);
        let err = coerce_ids(raw.as_array().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "No valid ids");
    }

    #[test]
    fn id_list_must_be_non_empty_array() {
        assert!(id_list(None).is_err());
        assert!(id_list(Some(&json!([]))).is_err());
        assert!(id_list(Some(&json!("1,2"))).is_err());
        assert!(id_list(Some(&json!([1]))).is_ok());
    }

    #[tokio::test]
    async fn list_applies_resolved_sort() {
        let store = MemoryUserStore::new();
        seed(&store, &["c@x.com", "a@x.com", "b@x.com"]).await;
        let res = list_users(
            &store,
            ListQuery {
                sort_by: Some("email".into()),
                sort_order: Some("asc".into()),
            },
        )
        .await
        .unwrap();
        let emails: Vec<_> = res.users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["a@x.com", "b@x.com", "c@x.com"]);
        assert_eq!(res.count, 3);
        assert_eq!(SortSpec::resolve(Some("email"), None).field, SortField::Email);
    }

    #[tokio::test]
    async fn status_update_is_case_insensitive_and_counts_rows() {
        let store = MemoryUserStore::new();
        let ids = seed(&store, &["a@x.com", "b@x.com"]).await;
        let res = update_status(
            &store,
            BulkStatusRequest {
                user_ids: Some(json!([ids[0], ids[1].to_string(), "junk"])),
                status: Some("BLOCKED".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(res.affected_rows, 2);
        let user = store.find_by_id(ids[0]).await.unwrap().unwrap();
        assert_eq!(user.status, UserStatus::Blocked);
    }

    #[tokio::test]
    async fn status_update_rejects_unknown_status() {
        let store = MemoryUserStore::new();
        let err = update_status(
            &store,
            BulkStatusRequest {
                user_ids: Some(json!([1])),
                status: Some("deleted".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn status_update_with_no_match_is_not_found_and_releases() {
        let store = MemoryUserStore::new();
        seed(&store, &["a@x.com"]).await;
        let err = update_status(
            &store,
            BulkStatusRequest {
                user_ids: Some(json!([404])),
                status: Some("active".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.is_idle());
    }

    #[tokio::test]
    async fn delete_removes_rows() {
        let store = MemoryUserStore::new();
        let ids = seed(&store, &["a@x.com", "b@x.com", "c@x.com"]).await;
        let res = delete_users(
            &store,
            BulkDeleteRequest {
                user_ids: Some(json!([ids[0], ids[2], 999])),
            },
        )
        .await
        .unwrap();
        assert_eq!(res.affected_rows, 2);
        assert_eq!(store.user_count().await, 1);
        assert!(store.find_by_id(ids[1]).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_with_no_match_leaves_store_unchanged() {
        let store = MemoryUserStore::new();
        seed(&store, &["a@x.com"]).await;
        let err = delete_users(
            &store,
            BulkDeleteRequest {
                user_ids: Some(json!([998, 999])),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.user_count().await, 1);
        assert!(store.is_idle());
    }
}
