use serde::{Deserialize, Serialize};
use crate::models::domain::{CandidateProfile, SortOrder};

/// Read-only view of a feed as published to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub candidates: Vec<CandidateProfile>,
    #[serde(rename = "isLoading")]
    pub is_loading: bool,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
    #[serde(rename = "matchesToday")]
    pub matches_today: u32,
    #[serde(rename = "canUndo")]
    pub can_undo: bool,
    #[serde(rename = "sortOrder")]
    pub sort_order: SortOrder,
    #[serde(rename = "searchActive")]
    pub search_active: bool,
}

/// Result of a swipe submitted over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeResponse {
    #[serde(rename = "isMatch")]
    pub is_match: bool,
    #[serde(rename = "entryId")]
    pub entry_id: String,
    pub feed: QueueSnapshot,
}

/// Result of an undo request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoResponse {
    /// False when there was nothing undoable
    pub restored: bool,
    pub feed: QueueSnapshot,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(rename = "activeFeeds")]
    pub active_feeds: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
