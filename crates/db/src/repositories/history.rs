use chrono::{DateTime, Utc};
use uuid::Uuid;

use vintner_core::decision::path::BranchPath;
use vintner_core::decision::states::NextAction;
use vintner_core::domain::filter::WineFilter;
use vintner_core::domain::record::{DecisionRecord, RecordId, UserId};

use super::{DecisionHistoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDecisionHistoryRepository {
    pool: DbPool,
}

impl SqlDecisionHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DecisionHistoryRepository for SqlDecisionHistoryRepository {
    async fn append(&self, record: DecisionRecord) -> Result<(), RepositoryError> {
        let filter_snapshot = serde_json::to_string(&record.filter)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        let action = serde_json::to_string(&record.action)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO decision_history (id, user_id, filter_snapshot, action, path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(record.id.0.to_string())
        .bind(&record.user_id.0)
        .bind(filter_snapshot)
        .bind(action)
        .bind(record.path.to_string())
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_by_user(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DecisionRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT id, user_id, filter_snapshot, action, path, created_at
             FROM decision_history
             WHERE user_id = ?1 AND created_at >= ?2
             ORDER BY created_at DESC",
        )
        .bind(&user_id.0)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HistoryRow::into_record).collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: String,
    user_id: String,
    filter_snapshot: String,
    action: String,
    path: String,
    created_at: DateTime<Utc>,
}

impl HistoryRow {
    fn into_record(self) -> Result<DecisionRecord, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|error| RepositoryError::Decode(format!("record id: {error}")))?;
        let filter: WineFilter = serde_json::from_str(&self.filter_snapshot)
            .map_err(|error| RepositoryError::Decode(format!("filter snapshot: {error}")))?;
        let action: NextAction = serde_json::from_str(&self.action)
            .map_err(|error| RepositoryError::Decode(format!("action: {error}")))?;
        let path: BranchPath = self
            .path
            .parse()
            .map_err(|error| RepositoryError::Decode(format!("path: {error}")))?;

        Ok(DecisionRecord {
            id: RecordId(id),
            user_id: UserId(self.user_id),
            filter,
            action,
            path,
            created_at: self.created_at,
        })
    }
}
