use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use vintner_core::domain::record::{DecisionRecord, UserId};

pub mod history;
pub mod memory;

pub use history::SqlDecisionHistoryRepository;
pub use memory::InMemoryDecisionHistoryRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Append-only decision history. Records are never updated or deleted; the
/// engine reads back only a trailing window of them.
#[async_trait]
pub trait DecisionHistoryRepository: Send + Sync {
    async fn append(&self, record: DecisionRecord) -> Result<(), RepositoryError>;

    /// Records for one user created at or after `since`, ordered
    /// most-recent-first.
    async fn recent_by_user(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DecisionRecord>, RepositoryError>;
}

#[async_trait]
impl<T: DecisionHistoryRepository + ?Sized> DecisionHistoryRepository for std::sync::Arc<T> {
    async fn append(&self, record: DecisionRecord) -> Result<(), RepositoryError> {
        (**self).append(record).await
    }

    async fn recent_by_user(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DecisionRecord>, RepositoryError> {
        (**self).recent_by_user(user_id, since).await
    }
}
