//! Storage contracts consumed by the toggle service.
//!
//! The booking relation is only ever mutated through [`BookingStore::try_add`]
//! and [`BookingStore::try_remove`]; both are single-statement compare-and-act
//! primitives, so callers never need their own locking.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AddResult, ClassId, GymClass, MemberId, RemoveResult};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    #[error("referenced class or member does not exist")]
    MissingReference,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

// SQLITE_BUSY and SQLITE_LOCKED; sqlx reports extended codes, the primary
// code lives in the low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_) => StoreError::Unavailable(err),
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::MissingReference
            }
            sqlx::Error::Database(db) => {
                let primary = db
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| code & 0xff);
                match primary {
                    Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) => StoreError::Unavailable(err),
                    _ => StoreError::Database(err),
                }
            }
            _ => StoreError::Database(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClassUpdateError {
    #[error("class not found")]
    NotFound,
    #[error("class was modified concurrently")]
    Conflict,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassCatalog: Send + Sync {
    async fn find_class(&self, id: ClassId) -> Result<Option<GymClass>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn member_exists(&self, id: &MemberId) -> Result<bool, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Advisory only: the answer may be stale by the time a mutation runs.
    async fn exists(&self, member: &MemberId, class: ClassId) -> Result<bool, StoreError>;

    /// Inserts the pair unless it is already present. A concurrent insert
    /// that wins the race is reported as [`AddResult::AlreadyExists`].
    async fn try_add(&self, member: &MemberId, class: ClassId) -> Result<AddResult, StoreError>;

    async fn try_remove(
        &self,
        member: &MemberId,
        class: ClassId,
    ) -> Result<RemoveResult, StoreError>;
}
