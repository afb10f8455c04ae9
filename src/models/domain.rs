use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Where a candidate lives, plus the precomputed proximity hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Set by the repository relative to the viewing user's max distance
    #[serde(rename = "isNearby", default)]
    pub is_nearby: bool,
}

/// A profile that can appear in the discovery feed
///
/// Candidates are never mutated once fetched. A refresh replaces them wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(rename = "contentTags", default)]
    pub content_tags: BTreeSet<String>,
    #[serde(rename = "collaborationTypes", default)]
    pub collaboration_types: BTreeSet<String>,
    #[serde(rename = "isVerified", default)]
    pub is_verified: bool,
    #[serde(rename = "followerCount", default)]
    pub follower_count: u64,
    #[serde(rename = "mediaUrls", default)]
    pub media_urls: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl CandidateProfile {
    pub fn is_nearby(&self) -> bool {
        self.location.as_ref().map(|l| l.is_nearby).unwrap_or(false)
    }
}

/// Compatibility criteria the repository applies server-side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryPreferences {
    #[serde(rename = "preferredGenders", default)]
    pub preferred_genders: Vec<String>,
    #[serde(rename = "minAge", default = "default_min_age")]
    pub min_age: u8,
    #[serde(rename = "maxAge", default = "default_max_age")]
    pub max_age: u8,
    #[serde(rename = "maxDistanceKm", default = "default_max_distance_km")]
    pub max_distance_km: u16,
}

impl Default for DiscoveryPreferences {
    fn default() -> Self {
        Self {
            preferred_genders: Vec::new(),
            min_age: default_min_age(),
            max_age: default_max_age(),
            max_distance_km: default_max_distance_km(),
        }
    }
}

fn default_min_age() -> u8 { 18 }
fn default_max_age() -> u8 { 99 }
fn default_max_distance_km() -> u16 { 50 }

/// The current user's own stored profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub preferences: DiscoveryPreferences,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwipeAction {
    Pass,
    Like,
    SuperLike,
}

impl SwipeAction {
    /// Whether this action expresses interest and can produce a match
    pub fn is_positive(self) -> bool {
        matches!(self, SwipeAction::Like | SwipeAction::SuperLike)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SwipeAction::Pass => "pass",
            SwipeAction::Like => "like",
            SwipeAction::SuperLike => "superLike",
        }
    }
}

/// One accept/reject decision. Deletion is the only update path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwipeDecision {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "targetUserId")]
    pub target_user_id: String,
    pub action: SwipeAction,
    #[serde(rename = "decidedAt")]
    pub decided_at: DateTime<Utc>,
}

impl SwipeDecision {
    pub fn new(user_id: impl Into<String>, target_user_id: impl Into<String>, action: SwipeAction) -> Self {
        Self {
            user_id: user_id.into(),
            target_user_id: target_user_id.into(),
            action,
            decided_at: Utc::now(),
        }
    }
}

/// Lifecycle of a decision inside the history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwipePhase {
    /// Applied locally, repository write still in flight
    Optimistic,
    Persisted,
}

/// A decision together with the profile it was made against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwipeHistoryEntry {
    pub id: Uuid,
    pub decision: SwipeDecision,
    pub profile: CandidateProfile,
    pub phase: SwipePhase,
}

impl SwipeHistoryEntry {
    pub fn new(decision: SwipeDecision, profile: CandidateProfile) -> Self {
        Self {
            id: Uuid::new_v4(),
            decision,
            profile,
            phase: SwipePhase::Optimistic,
        }
    }

    /// Only persisted decisions can be deleted remotely on undo
    pub fn is_persisted(&self) -> bool {
        self.phase == SwipePhase::Persisted
    }
}

/// Mutual match record. Participant order carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(rename = "user1Id")]
    pub user1_id: String,
    #[serde(rename = "user2Id")]
    pub user2_id: String,
    #[serde(rename = "matchedAt")]
    pub matched_at: DateTime<Utc>,
    #[serde(rename = "hasConversation", default)]
    pub has_conversation: bool,
}

impl Match {
    /// Compare participants as an unordered pair
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.user1_id == a && self.user2_id == b) || (self.user1_id == b && self.user2_id == a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Keep fetch/search order
    #[default]
    Relevance,
    Newest,
    Followers,
    Distance,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_is_unordered() {
        let m = Match {
            user1_id: "b".to_string(),
            user2_id: "a".to_string(),
            matched_at: Utc::now(),
            has_conversation: false,
        };
        assert!(m.is_between("a", "b"));
        assert!(m.is_between("b", "a"));
        assert!(!m.is_between("a", "c"));
    }

    #[test]
    fn test_swipe_action_wire_names() {
        assert_eq!(serde_json::to_string(&SwipeAction::SuperLike).unwrap(), "\"superLike\"");
        assert!(SwipeAction::Like.is_positive());
        assert!(!SwipeAction::Pass.is_positive());
    }

    #[test]
    fn test_new_history_entry_is_optimistic() {
        let profile = CandidateProfile {
            user_id: "p1".to_string(),
            display_name: "P1".to_string(),
            age: None,
            location: None,
            content_tags: BTreeSet::new(),
            collaboration_types: BTreeSet::new(),
            is_verified: false,
            follower_count: 0,
            media_urls: vec![],
            created_at: Utc::now(),
        };
        let entry = SwipeHistoryEntry::new(SwipeDecision::new("me", "p1", SwipeAction::Pass), profile);
        assert!(!entry.is_persisted());
        assert!(!entry.profile.is_nearby());
    }
}
