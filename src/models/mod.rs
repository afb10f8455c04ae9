// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BoundingBox, CandidateProfile, DiscoveryPreferences, Location, Match, SortOrder, SwipeAction,
    SwipeDecision, SwipeHistoryEntry, SwipePhase, UserProfile,
};
pub use requests::{
    FeedRequest, LoadFeedRequest, PresenceRequest, SearchRequest, SwipeRequest, UpdateFiltersRequest,
};
pub use responses::{ErrorResponse, HealthResponse, QueueSnapshot, SwipeResponse, UndoResponse};
