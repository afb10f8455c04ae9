// Core engine exports
pub mod distance;
pub mod errors;
pub mod feed;
pub mod filters;
pub mod history;
pub mod matcher;
pub mod ports;
pub mod queue;
pub mod search;
pub mod swipe;

pub use errors::{FeedError, FeedResult};
pub use feed::{DiscoveryFeed, FeedEvent, FeedSettings, LoadOutcome};
pub use filters::{apply_filters, matches_criteria, sort_profiles, FilterCriteria};
pub use history::SwipeHistory;
pub use matcher::MatchDetector;
pub use ports::{PresenceService, ProfileRepository, RepositoryError, RepositoryResult};
pub use queue::CandidateQueue;
pub use search::{SearchCache, SearchKey};
pub use swipe::{SwipeOutcome, UndoOutcome};
