use thiserror::Error;
use tracing::info;

use vintner_agent::DecisionEngine;
use vintner_core::config::{AppConfig, ConfigError, LoadOptions};
use vintner_db::{connect_with_settings, migrations, DbPool, SqlDecisionHistoryRepository};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: DecisionEngine<SqlDecisionHistoryRepository>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let engine = DecisionEngine::new(
        SqlDecisionHistoryRepository::new(db_pool.clone()),
        config.engine.decision_settings(),
    );

    Ok(Application { config, db_pool, engine })
}

#[cfg(test)]
mod tests {
    use vintner_core::config::{ConfigOverrides, LoadOptions};
    use vintner_core::decision::path::BranchToken;
    use vintner_core::decision::states::NextAction;
    use vintner_core::domain::filter::WineFilter;
    use vintner_core::domain::record::UserId;

    use crate::bootstrap::bootstrap;

    fn memory_options(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_history_window() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                history_window_mins: Some(0),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("history_window_mins"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_and_a_full_exchange() {
        let app = bootstrap(memory_options("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed against an in-memory database");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name = 'decision_history'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected history table to be available after bootstrap");
        assert_eq!(table_count, 1, "bootstrap should expose the decision history table");

        let user = UserId("U-INT-1".to_string());
        let filter = WineFilter { country: Some("France".to_string()), ..WineFilter::default() };

        let first = app.engine.decide_action(&user, &filter).await.expect("turn one");
        assert_eq!(first.path.last(), Some(BranchToken::PromptPrimary));

        let second = app.engine.decide_action(&user, &filter).await.expect("turn two");
        assert_eq!(second.path.last(), Some(BranchToken::PromptSecondary));

        let third = app.engine.decide_action(&user, &filter).await.expect("turn three");
        assert_eq!(third.path.last(), Some(BranchToken::Recommend));
        assert!(matches!(third.action, NextAction::Recommendation));

        app.db_pool.close().await;
    }
}
