//! Collaborator contracts consumed by the discovery engine.
//!
//! The engine never talks to storage or presence directly; both are injected
//! as trait objects so it can run against live adapters or in-memory fakes.

use async_trait::async_trait;
use thiserror::Error;
use crate::models::{CandidateProfile, Match, SwipeDecision, UserProfile};

/// Errors surfaced by any repository implementation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RepositoryError {
    #[error("Network unavailable: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Repository error: {0}")]
    Backend(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Source of truth for profiles, swipe decisions and matches
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// The stored profile of a user, `None` if the user never created one
    async fn fetch_profile(&self, user_id: &str) -> RepositoryResult<Option<UserProfile>>;

    /// Ids the user has already decided on
    async fn fetch_excluded_ids(&self, user_id: &str) -> RepositoryResult<Vec<String>>;

    /// Candidates compatible with `for_user`, never containing any id in `excluding`
    async fn fetch_candidates(
        &self,
        for_user: &UserProfile,
        limit: usize,
        excluding: &[String],
    ) -> RepositoryResult<Vec<CandidateProfile>>;

    async fn record_decision(&self, decision: &SwipeDecision) -> RepositoryResult<()>;

    async fn delete_decision(&self, user_id: &str, target_user_id: &str) -> RepositoryResult<()>;

    async fn fetch_matches(&self, user_id: &str) -> RepositoryResult<Vec<Match>>;

    /// Server-side search. Results are expected to be filtered already.
    async fn search_profiles(
        &self,
        query: &str,
        filter_tags: &[String],
    ) -> RepositoryResult<Vec<CandidateProfile>>;
}

/// "Online now" collaborator
#[async_trait]
pub trait PresenceService: Send + Sync {
    /// Warm the presence lookup for a freshly loaded batch of candidates
    async fn prefetch_online_status(&self, user_ids: &[String]);

    fn is_online(&self, user_id: &str) -> bool;
}
