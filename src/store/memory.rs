//! In-process credential store.
//!
//! Transactions are serialised behind one async mutex. `begin` snapshots the table;
//! rollback, or dropping the transaction without committing, restores it.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{NewUser, SortSpec, StoreError, User, UserStatus, UserStore, UserTx, UserWithPassword};

type Table = BTreeMap<i64, UserWithPassword>;

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    table: Arc<Mutex<Table>>,
    // Outside the snapshot so rolled-back inserts never free an ID.
    next_id: Arc<AtomicI64>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no transaction currently holds the table.
    pub fn is_idle(&self) -> bool {
        self.table.try_lock().is_ok()
    }

    pub async fn user_count(&self) -> usize {
        self.table.lock().await.len()
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryUserStore {
    async fn begin(&self) -> Result<Box<dyn UserTx>, StoreError> {
        let guard = self.table.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            snapshot: Some(snapshot),
            next_id: self.next_id.clone(),
        }))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.table.lock().await.get(&id).map(|row| row.user.clone()))
    }

    async fn list_all(&self, sort: SortSpec) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .table
            .lock()
            .await
            .values()
            .map(|row| row.user.clone())
            .collect();
        users.sort_by(|a, b| sort.compare(a, b));
        Ok(users)
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Table>,
    /// `None` once committed.
    snapshot: Option<Table>,
    next_id: Arc<AtomicI64>,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait::async_trait]
impl UserTx for MemoryTx {
    async fn find_by_email(&mut self, email: &str) -> Result<Option<UserWithPassword>, StoreError> {
        Ok(self.guard.values().find(|row| row.user.email == email).cloned())
    }

    async fn find_by_id(&mut self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.guard.get(&id).map(|row| row.user.clone()))
    }

    async fn email_exists(&mut self, email: &str) -> Result<bool, StoreError> {
        Ok(self.guard.values().any(|row| row.user.email == email))
    }

    async fn insert(&mut self, user: &NewUser) -> Result<i64, StoreError> {
        if self.guard.values().any(|row| row.user.email == user.email) {
            return Err(StoreError::Conflict);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.guard.insert(
            id,
            UserWithPassword {
                user: User {
                    id,
                    email: user.email.clone(),
                    first_name: user.first_name.clone(),
                    last_name: user.last_name.clone(),
                    job_title: user.job_title.clone(),
                    company: user.company.clone(),
                    status: UserStatus::default(),
                    registration_date: OffsetDateTime::now_utc(),
                    last_login_date: None,
                },
                password_digest: user.password_digest.clone(),
            },
        );
        Ok(id)
    }

    async fn update_last_login(&mut self, id: i64, at: OffsetDateTime) -> Result<(), StoreError> {
        if let Some(row) = self.guard.get_mut(&id) {
            row.user.last_login_date = Some(at);
        }
        Ok(())
    }

    async fn update_status_bulk(&mut self, ids: &[i64], status: UserStatus) -> Result<u64, StoreError> {
        let mut matched = 0;
        for id in dedup(ids) {
            if let Some(row) = self.guard.get_mut(&id) {
                row.user.status = status;
                matched += 1;
            }
        }
        Ok(matched)
    }

    async fn delete_bulk(&mut self, ids: &[i64]) -> Result<u64, StoreError> {
        let mut removed = 0;
        for id in dedup(ids) {
            if self.guard.remove(&id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut tx = self;
        tx.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        // Drop restores the snapshot.
        Ok(())
    }
}

// `id = ANY($1)` matches each row once however often it is listed.
fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut out = ids.to_vec();
    out.sort_unstable();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_digest: "digest".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            job_title: None,
            company: None,
        }
    }

    #[tokio::test]
    async fn committed_insert_is_visible() {
        let store = MemoryUserStore::new();
        let mut tx = store.begin().await.unwrap();
        let id = tx.insert(&new_user("a@b.com")).await.unwrap();
        tx.commit().await.unwrap();

        let user = store.find_by_id(id).await.unwrap().expect("user exists");
        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.status, UserStatus::Active);
        assert!(user.last_login_date.is_none());
        assert!(store.is_idle());
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back_and_releases() {
        let store = MemoryUserStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert(&new_user("a@b.com")).await.unwrap();
            assert!(!store.is_idle());
        }
        assert!(store.is_idle());
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_rollback() {
        let store = MemoryUserStore::new();
        let mut tx = store.begin().await.unwrap();
        let first = tx.insert(&new_user("a@b.com")).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let second = tx.insert(&new_user("a@b.com")).await.unwrap();
        tx.commit().await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn duplicate_email_insert_conflicts() {
        let store = MemoryUserStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert(&new_user("a@b.com")).await.unwrap();
        let err = tx.insert(&new_user("a@b.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn bulk_ops_on_empty_ids_return_zero() {
        let store = MemoryUserStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert(&new_user("a@b.com")).await.unwrap();
        assert_eq!(tx.update_status_bulk(&[], UserStatus::Blocked).await.unwrap(), 0);
        assert_eq!(tx.delete_bulk(&[]).await.unwrap(), 0);
        tx.commit().await.unwrap();
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn bulk_status_counts_matched_rows_once() {
        let store = MemoryUserStore::new();
        let mut tx = store.begin().await.unwrap();
        let a = tx.insert(&new_user("a@b.com")).await.unwrap();
        let b = tx.insert(&new_user("b@b.com")).await.unwrap();
        let n = tx
            .update_status_bulk(&[a, a, b, 999], UserStatus::Blocked)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(n, 2);
        let user = store.find_by_id(a).await.unwrap().unwrap();
        assert_eq!(user.status, UserStatus::Blocked);
    }
}
