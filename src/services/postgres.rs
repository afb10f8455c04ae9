use crate::core::ports::RepositoryError;
use crate::models::SwipeDecision;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl From<PostgresError> for RepositoryError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::SqlxError(sqlx::Error::Io(e)) => RepositoryError::Network(e.to_string()),
            PostgresError::SqlxError(sqlx::Error::PoolTimedOut) => {
                RepositoryError::Network("connection pool timed out".to_string())
            }
            other => RepositoryError::Backend(other.to_string()),
        }
    }
}

/// PostgreSQL client for swipe decisions
///
/// Appwrite owns profiles and matches; every decision a user makes lives
/// here, one row per (user, target) pair. The set of target ids for a user is
/// exactly the set of profiles their feed must never show again.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Record a decision
    ///
    /// A repeated decision on the same target replaces the earlier one.
    pub async fn record_decision(&self, decision: &SwipeDecision) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO swipe_decisions (user_id, target_user_id, action, decided_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, target_user_id)
            DO UPDATE SET
                action = EXCLUDED.action,
                decided_at = EXCLUDED.decided_at
        "#;

        sqlx::query(query)
            .bind(&decision.user_id)
            .bind(&decision.target_user_id)
            .bind(decision.action.as_str())
            .bind(decision.decided_at)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Recorded decision: {} -> {} ({})",
            decision.user_id,
            decision.target_user_id,
            decision.action.as_str()
        );

        Ok(())
    }

    /// All target ids the user has decided on
    pub async fn decided_ids(&self, user_id: &str) -> Result<Vec<String>, PostgresError> {
        let query = r#"
            SELECT target_user_id
            FROM swipe_decisions
            WHERE user_id = $1
        "#;

        let rows = sqlx::query(query).bind(user_id).fetch_all(&self.pool).await?;

        let ids: Vec<String> = rows.iter().map(|row| row.get("target_user_id")).collect();

        tracing::debug!("User {} has decided on {} profiles", user_id, ids.len());

        Ok(ids)
    }

    /// Remove a decision, returning whether one existed
    pub async fn delete_decision(
        &self,
        user_id: &str,
        target_user_id: &str,
    ) -> Result<bool, PostgresError> {
        let query = r#"
            DELETE FROM swipe_decisions
            WHERE user_id = $1 AND target_user_id = $2
        "#;

        let result = sqlx::query(query)
            .bind(user_id)
            .bind(target_user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_network_error() {
        let err = PostgresError::SqlxError(sqlx::Error::PoolTimedOut);
        assert!(matches!(RepositoryError::from(err), RepositoryError::Network(_)));
    }
}
