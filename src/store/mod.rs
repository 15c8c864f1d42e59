//! Credential store abstraction.
//!
//! Backends implement [`UserStore`] so the account operations never depend on a
//! concrete database. Mutating work goes through a [`UserTx`] obtained from
//! [`UserStore::begin`]; dropping a transaction without committing rolls it back
//! and returns its connection to the pool.

pub mod memory;
pub mod postgres;
pub mod sort;
pub mod types;

use thiserror::Error;
use time::OffsetDateTime;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;
pub use sort::{SortField, SortOrder, SortSpec};
pub use types::{NewUser, User, UserStatus, UserWithPassword};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict")]
    Conflict,
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Acquire a connection and open a transaction on it.
    async fn begin(&self) -> Result<Box<dyn UserTx>, StoreError>;

    /// Look up a user by ID, without the password digest.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Every user, ordered by `sort`.
    async fn list_all(&self, sort: SortSpec) -> Result<Vec<User>, StoreError>;
}

/// One open transaction. Statements run in call order and become visible to other
/// sessions only on [`UserTx::commit`].
#[async_trait::async_trait]
pub trait UserTx: Send {
    /// Exact match; the only lookup that surfaces the digest.
    async fn find_by_email(&mut self, email: &str) -> Result<Option<UserWithPassword>, StoreError>;

    async fn find_by_id(&mut self, id: i64) -> Result<Option<User>, StoreError>;

    async fn email_exists(&mut self, email: &str) -> Result<bool, StoreError>;

    /// Returns the assigned ID. Fails with [`StoreError::Conflict`] if the email was
    /// taken concurrently.
    async fn insert(&mut self, user: &NewUser) -> Result<i64, StoreError>;

    async fn update_last_login(&mut self, id: i64, at: OffsetDateTime) -> Result<(), StoreError>;

    /// Returns the number of rows matched. An empty `ids` is a no-op returning 0.
    async fn update_status_bulk(&mut self, ids: &[i64], status: UserStatus) -> Result<u64, StoreError>;

    /// Returns the number of rows removed. An empty `ids` is a no-op returning 0.
    async fn delete_bulk(&mut self, ids: &[i64]) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Roll `tx` back and hand `err` through. A failed rollback is only logged; the
/// connection is released either way.
pub async fn abort<E>(tx: Box<dyn UserTx>, err: E) -> E {
    if let Err(rb) = tx.rollback().await {
        tracing::warn!(error = %rb, "rollback failed");
    }
    err
}
