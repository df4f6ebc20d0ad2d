use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::path::BranchPath;
use crate::decision::states::{DecisionOutcome, NextAction};
use crate::domain::filter::WineFilter;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// One decision the engine made for one user turn. Append-only audit data:
/// never mutated or deleted, purged only by the store's retention policy.
/// The filter snapshot is for replay and audit; it is never re-evaluated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub filter: WineFilter,
    pub action: NextAction,
    pub path: BranchPath,
    pub created_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(user_id: UserId, filter: WineFilter, outcome: DecisionOutcome) -> Self {
        Self {
            id: RecordId(Uuid::new_v4()),
            user_id,
            filter,
            action: outcome.action,
            path: outcome.path,
            created_at: Utc::now(),
        }
    }
}
