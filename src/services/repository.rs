use async_trait::async_trait;
use std::sync::Arc;

use crate::core::ports::{ProfileRepository, RepositoryResult};
use crate::models::{CandidateProfile, Match, SwipeDecision, UserProfile};
use crate::services::appwrite::AppwriteClient;
use crate::services::postgres::PostgresClient;

/// Live repository: profiles and matches from Appwrite, decisions in PostgreSQL
pub struct LumeRepository {
    appwrite: Arc<AppwriteClient>,
    postgres: Arc<PostgresClient>,
}

impl LumeRepository {
    pub fn new(appwrite: Arc<AppwriteClient>, postgres: Arc<PostgresClient>) -> Self {
        Self { appwrite, postgres }
    }
}

#[async_trait]
impl ProfileRepository for LumeRepository {
    async fn fetch_profile(&self, user_id: &str) -> RepositoryResult<Option<UserProfile>> {
        Ok(self.appwrite.get_profile(user_id).await?)
    }

    async fn fetch_excluded_ids(&self, user_id: &str) -> RepositoryResult<Vec<String>> {
        Ok(self.postgres.decided_ids(user_id).await?)
    }

    async fn fetch_candidates(
        &self,
        for_user: &UserProfile,
        limit: usize,
        excluding: &[String],
    ) -> RepositoryResult<Vec<CandidateProfile>> {
        Ok(self.appwrite.query_candidates(for_user, limit, excluding).await?)
    }

    async fn record_decision(&self, decision: &SwipeDecision) -> RepositoryResult<()> {
        Ok(self.postgres.record_decision(decision).await?)
    }

    async fn delete_decision(&self, user_id: &str, target_user_id: &str) -> RepositoryResult<()> {
        let existed = self.postgres.delete_decision(user_id, target_user_id).await?;
        if !existed {
            tracing::debug!("No stored decision {} -> {} to delete", user_id, target_user_id);
        }
        Ok(())
    }

    async fn fetch_matches(&self, user_id: &str) -> RepositoryResult<Vec<Match>> {
        Ok(self.appwrite.list_matches(user_id).await?)
    }

    async fn search_profiles(
        &self,
        query: &str,
        filter_tags: &[String],
    ) -> RepositoryResult<Vec<CandidateProfile>> {
        Ok(self.appwrite.search_profiles(query, filter_tags).await?)
    }
}
