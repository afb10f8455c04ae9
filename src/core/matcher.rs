use crate::core::ports::{ProfileRepository, RepositoryResult};
use crate::models::Match;

/// Post-swipe reciprocity check
///
/// Matches are created by the repository when both directions of interest
/// exist. This only looks for the record after a positive swipe persisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchDetector;

impl MatchDetector {
    pub fn new() -> Self {
        Self
    }

    /// Whether any match of `user_id` pairs them with `target_user_id`
    pub async fn detect(
        &self,
        repository: &dyn ProfileRepository,
        user_id: &str,
        target_user_id: &str,
    ) -> RepositoryResult<Option<Match>> {
        let matches = repository.fetch_matches(user_id).await?;

        tracing::debug!("User {} has {} matches", user_id, matches.len());

        Ok(find_match(matches, user_id, target_user_id))
    }
}

/// Pick the match between the two users, in either participant order
pub fn find_match(matches: Vec<Match>, user_id: &str, target_user_id: &str) -> Option<Match> {
    matches.into_iter().find(|m| m.is_between(user_id, target_user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pair(a: &str, b: &str) -> Match {
        Match {
            user1_id: a.to_string(),
            user2_id: b.to_string(),
            matched_at: Utc::now(),
            has_conversation: false,
        }
    }

    #[test]
    fn test_find_match_either_order() {
        assert!(find_match(vec![pair("me", "a")], "me", "a").is_some());
        assert!(find_match(vec![pair("a", "me")], "me", "a").is_some());
    }

    #[test]
    fn test_find_match_requires_both_participants() {
        let matches = vec![pair("me", "b"), pair("a", "c")];
        assert!(find_match(matches, "me", "a").is_none());
        assert!(find_match(vec![], "me", "a").is_none());
    }
}
