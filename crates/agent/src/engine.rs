use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::sync::Mutex;

use vintner_core::decision::states::{DecisionOutcome, DecisionSettings};
use vintner_core::decision::table::decide;
use vintner_core::domain::filter::WineFilter;
use vintner_core::domain::record::{DecisionRecord, UserId};
use vintner_db::{DecisionHistoryRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("history store unavailable: {0}")]
    History(#[from] RepositoryError),
}

/// Drives one decision per conversation turn: loads the user's trailing
/// history window, evaluates the decision table against it, and appends the
/// resulting record.
///
/// Turns for the same user are serialized through a per-user lock so that
/// concurrent requests cannot interleave between the history read and the
/// append. Turns for different users proceed in parallel.
pub struct DecisionEngine<H, R = StdRng> {
    history: H,
    settings: DecisionSettings,
    rng: Mutex<R>,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl<H> DecisionEngine<H, StdRng>
where
    H: DecisionHistoryRepository,
{
    pub fn new(history: H, settings: DecisionSettings) -> Self {
        Self::with_rng(history, settings, StdRng::from_entropy())
    }
}

impl<H, R> DecisionEngine<H, R>
where
    H: DecisionHistoryRepository,
    R: Rng + Send,
{
    pub fn with_rng(history: H, settings: DecisionSettings, rng: R) -> Self {
        Self {
            history,
            settings,
            rng: Mutex::new(rng),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn decide_action(
        &self,
        user_id: &UserId,
        filter: &WineFilter,
    ) -> Result<DecisionOutcome, EngineError> {
        let user_lock = self.user_lock(user_id).await;
        let _turn = user_lock.lock().await;

        let since = Utc::now() - Duration::minutes(self.settings.history_window_mins);
        let recent = self.history.recent_by_user(user_id, since).await?;
        let previous = recent.first().map(|record| &record.path);

        let outcome = {
            let mut rng = self.rng.lock().await;
            decide(filter, previous, &self.settings, &mut *rng)
        };

        if outcome.path.is_empty() {
            tracing::warn!(
                event_name = "engine.decision.unclassified",
                user_id = %user_id.0,
                "filter matched no branch, falling back to recommendation without recording"
            );
            return Ok(outcome);
        }

        let record = DecisionRecord::new(user_id.clone(), filter.clone(), outcome.clone());
        self.history.append(record).await?;
        tracing::info!(
            event_name = "engine.decision.recorded",
            user_id = %user_id.0,
            path = %outcome.path,
            action = outcome.action.kind(),
            "decision recorded"
        );

        Ok(outcome)
    }

    /// Lock handle for one user. The map guard is released before the
    /// caller awaits the per-user lock, so one slow turn never blocks
    /// other users.
    async fn user_lock(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        Arc::clone(locks.entry(user_id.clone()).or_default())
    }
}
