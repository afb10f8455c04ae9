//! Lume Discovery - swipe feed and matching engine for the Lume creator app
//!
//! The engine keeps a per-user queue of candidate profiles, filters and
//! searches it, records swipe decisions optimistically, detects mutual
//! matches and supports a bounded undo history. Storage and presence are
//! injected through the traits in [`core::ports`].

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    DiscoveryFeed, FeedError, FeedEvent, FeedSettings, FilterCriteria, LoadOutcome, PresenceService,
    ProfileRepository, RepositoryError, SwipeOutcome, UndoOutcome,
};
pub use models::{CandidateProfile, Match, QueueSnapshot, SortOrder, SwipeAction, SwipeHistoryEntry, UserProfile};
