use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;
use crate::models::domain::{SortOrder, SwipeAction};

/// Request to (re)load a user's feed
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoadFeedRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(default = "default_true")]
    #[serde(alias = "exclude_previously_decided", rename = "excludePreviouslyDecided")]
    pub exclude_previously_decided: bool,
}

fn default_true() -> bool {
    true
}

/// Request addressed to an already loaded feed
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeedRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

/// Request to swipe on a candidate in the user's queue
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SwipeRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "target_user_id", rename = "targetUserId")]
    pub target_user_id: String,
    pub action: SwipeAction,
}

/// Replace the filter criteria of a feed. Omitted fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateFiltersRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(rename = "minAge")]
    pub min_age: Option<u8>,
    #[serde(rename = "maxAge")]
    pub max_age: Option<u8>,
    #[serde(rename = "verifiedOnly")]
    pub verified_only: Option<bool>,
    #[serde(rename = "onlineOnly")]
    pub online_only: Option<bool>,
    #[serde(rename = "maxDistanceKm")]
    pub max_distance_km: Option<u16>,
    #[serde(rename = "contentTags")]
    pub content_tags: Option<BTreeSet<String>>,
    #[serde(rename = "collaborationTypes")]
    pub collaboration_types: Option<BTreeSet<String>>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<SortOrder>,
}

/// Free-text search keystroke
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub query: String,
}

/// Presence report for a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceRequest {
    pub online: bool,
}
