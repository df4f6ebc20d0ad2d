use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use vintner_core::domain::record::{DecisionRecord, UserId};

use super::{DecisionHistoryRepository, RepositoryError};

/// In-memory store for tests and local runs. Mirrors the SQL repository's
/// contract, including most-recent-first ordering.
#[derive(Default)]
pub struct InMemoryDecisionHistoryRepository {
    records: RwLock<Vec<DecisionRecord>>,
}

impl InMemoryDecisionHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DecisionHistoryRepository for InMemoryDecisionHistoryRepository {
    async fn append(&self, record: DecisionRecord) -> Result<(), RepositoryError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn recent_by_user(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DecisionRecord>, RepositoryError> {
        let records = self.records.read().await;
        let mut matching: Vec<DecisionRecord> = records
            .iter()
            .filter(|record| &record.user_id == user_id && record.created_at >= since)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}
