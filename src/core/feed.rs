//! Discovery feed state container and queue management.
//!
//! `DiscoveryFeed` owns every piece of mutable feed state behind one mutex.
//! Public methods mutate it in short critical sections that never span an
//! `.await`; repository and presence calls happen between them. The
//! presentation layer observes the feed through `watch` snapshots and a
//! `broadcast` stream of one-shot events.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::errors::{FeedError, FeedResult};
use crate::core::filters::{apply_filters, sort_profiles, FilterCriteria};
use crate::core::history::{SwipeHistory, DEFAULT_HISTORY_CAP};
use crate::core::matcher::MatchDetector;
use crate::core::ports::{PresenceService, ProfileRepository};
use crate::core::queue::{CandidateQueue, DEFAULT_LOW_WATER_MARK};
use crate::core::search::{searchable_query, SearchCache, SearchKey};
use crate::models::{CandidateProfile, Match, QueueSnapshot, SortOrder, SwipeHistoryEntry, UserProfile};

/// Tunables of a feed. Defaults match the product behavior.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Candidates shown per page
    pub page_size: usize,
    /// Candidates requested from the repository on a full load
    pub fetch_limit: usize,
    pub low_water_mark: usize,
    pub history_cap: usize,
    /// How long transient errors stay visible
    pub error_dismiss_after: Duration,
    pub search_debounce: Duration,
    pub search_cache_ttl: Duration,
    pub search_cache_capacity: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: 20,
            fetch_limit: 50,
            low_water_mark: DEFAULT_LOW_WATER_MARK,
            history_cap: DEFAULT_HISTORY_CAP,
            error_dismiss_after: Duration::from_secs(3),
            search_debounce: Duration::from_millis(300),
            search_cache_ttl: Duration::from_secs(300),
            search_cache_capacity: 20,
        }
    }
}

/// One-shot notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    MatchFound {
        profile: CandidateProfile,
        matched: Match,
    },
    TransientError {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Results were applied; `count` is the number of candidates added
    Loaded { count: usize },
    /// A newer load started before this one finished; nothing was applied
    Superseded,
    /// A load-more was already running
    AlreadyLoading,
}

/// How a committing load changes the exclusion set
#[derive(Debug)]
enum ExclusionUpdate {
    Merge(Vec<String>),
    Clear,
}

/// Everything a load fetched, applied only if the load is still current
#[derive(Debug)]
struct FetchedPage {
    profile: UserProfile,
    exclusions: ExclusionUpdate,
    candidates: Vec<CandidateProfile>,
}

pub(crate) struct FeedState {
    pub(crate) current_user_id: Option<String>,
    pub(crate) current_user: Option<UserProfile>,
    pub(crate) queue: CandidateQueue,
    pub(crate) history: SwipeHistory,
    pub(crate) criteria: FilterCriteria,
    pub(crate) sort_order: SortOrder,
    display_limit: usize,
    load_generation: u64,
    pub(crate) loading: bool,
    loading_more: bool,
    pending_reload: Option<JoinHandle<()>>,
    /// Profiles an undo returned while a load was in flight
    pub(crate) restored_during_load: Vec<CandidateProfile>,
    search_query: Option<String>,
    search_results: Option<Vec<CandidateProfile>>,
    search_generation: u64,
    pending_search: Option<JoinHandle<()>>,
    search_cache: SearchCache,
    pub(crate) matches_today: u32,
    pub(crate) matches_day: chrono::NaiveDate,
    error: Option<FeedError>,
    error_seq: u64,
}

pub(crate) struct FeedInner {
    pub(crate) repository: Arc<dyn ProfileRepository>,
    pub(crate) presence: Arc<dyn PresenceService>,
    pub(crate) matcher: MatchDetector,
    pub(crate) settings: FeedSettings,
    state: Mutex<FeedState>,
    snapshot_tx: watch::Sender<QueueSnapshot>,
    filters_tx: watch::Sender<FilterCriteria>,
    pub(crate) events_tx: broadcast::Sender<FeedEvent>,
}

/// A user's discovery feed: candidate queue, filters, search, swipes and undo
///
/// Cloning is cheap and every clone drives the same feed.
#[derive(Clone)]
pub struct DiscoveryFeed {
    pub(crate) inner: Arc<FeedInner>,
}

impl DiscoveryFeed {
    pub fn new(
        repository: Arc<dyn ProfileRepository>,
        presence: Arc<dyn PresenceService>,
        settings: FeedSettings,
    ) -> Self {
        let state = FeedState {
            current_user_id: None,
            current_user: None,
            queue: CandidateQueue::new(),
            history: SwipeHistory::new(settings.history_cap),
            criteria: FilterCriteria::default(),
            sort_order: SortOrder::default(),
            display_limit: settings.page_size,
            load_generation: 0,
            loading: false,
            loading_more: false,
            pending_reload: None,
            restored_during_load: Vec::new(),
            search_query: None,
            search_results: None,
            search_generation: 0,
            pending_search: None,
            search_cache: SearchCache::new(settings.search_cache_capacity, settings.search_cache_ttl),
            matches_today: 0,
            matches_day: chrono::Utc::now().date_naive(),
            error: None,
            error_seq: 0,
        };

        let (snapshot_tx, _) = watch::channel(QueueSnapshot::default());
        let (filters_tx, _) = watch::channel(FilterCriteria::default());
        let (events_tx, _) = broadcast::channel(32);

        Self {
            inner: Arc::new(FeedInner {
                repository,
                presence,
                matcher: MatchDetector::new(),
                settings,
                state: Mutex::new(state),
                snapshot_tx,
                filters_tx,
                events_tx,
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.inner.settings
    }

    // ---------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------

    pub fn snapshot(&self) -> QueueSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn subscribe_filters(&self) -> watch::Receiver<FilterCriteria> {
        self.inner.filters_tx.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<FeedEvent> {
        self.inner.events_tx.subscribe()
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.lock().current_user_id.clone()
    }

    pub fn candidates(&self) -> Vec<CandidateProfile> {
        self.lock().queue.displayed().to_vec()
    }

    pub fn find_candidate(&self, user_id: &str) -> Option<CandidateProfile> {
        self.lock().queue.find(user_id).cloned()
    }

    pub fn excluded_ids(&self) -> HashSet<String> {
        self.lock().queue.excluded().clone()
    }

    /// Oldest first
    pub fn history(&self) -> Vec<SwipeHistoryEntry> {
        self.lock().history.iter().cloned().collect()
    }

    pub fn last_swipe(&self) -> Option<SwipeHistoryEntry> {
        self.lock().history.last().cloned()
    }

    pub fn matches_today(&self) -> u32 {
        self.lock().matches_today
    }

    pub fn error(&self) -> Option<FeedError> {
        self.lock().error.clone()
    }

    pub fn clear_error(&self) {
        let mut state = self.lock();
        state.error = None;
        self.publish(&state);
    }

    pub(crate) fn publish(&self, state: &FeedState) {
        let snapshot = QueueSnapshot {
            candidates: state.queue.displayed().to_vec(),
            is_loading: state.loading || state.loading_more,
            error_message: state.error.as_ref().map(ToString::to_string),
            matches_today: state.matches_today,
            can_undo: state.history.last().map(|e| e.is_persisted()).unwrap_or(false),
            sort_order: state.sort_order,
            search_active: state.search_results.is_some(),
        };
        self.inner.snapshot_tx.send_replace(snapshot);
    }

    /// Put an error in the single error slot and notify subscribers
    pub(crate) fn surface_error(&self, state: &mut FeedState, error: &FeedError) {
        state.error_seq += 1;
        state.error = Some(error.clone());
        let _ = self.inner.events_tx.send(FeedEvent::TransientError {
            message: error.to_string(),
        });

        let Some(delay) = error.auto_dismiss_after(self.inner.settings.error_dismiss_after) else {
            return;
        };

        let seq = state.error_seq;
        let weak: Weak<FeedInner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else { return };
            let feed = DiscoveryFeed { inner };
            let mut state = feed.lock();
            // A newer error owns the slot now
            if state.error_seq == seq {
                state.error = None;
                feed.publish(&state);
            }
        });
    }

    /// Rebuild the displayed list from fetched candidates or search results
    pub(crate) fn recompute(&self, state: &mut FeedState) {
        let mut view = match &state.search_results {
            Some(results) => results
                .iter()
                .filter(|p| !state.queue.is_excluded(&p.user_id))
                .cloned()
                .collect(),
            None => {
                let mut filtered = apply_filters(
                    state.queue.fetched(),
                    &state.criteria,
                    self.inner.presence.as_ref(),
                );
                filtered.truncate(state.display_limit);
                filtered
            }
        };

        sort_profiles(&mut view, state.sort_order);
        state.queue.set_displayed(view);
    }

    // ---------------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------------

    /// Seed the queue for `current_user_id`
    ///
    /// A newer `load` supersedes this one: its results are then dropped and
    /// `LoadOutcome::Superseded` is returned.
    pub async fn load(
        &self,
        current_user_id: Option<&str>,
        exclude_previously_decided: bool,
    ) -> FeedResult<LoadOutcome> {
        let Some(user_id) = current_user_id.filter(|id| !id.is_empty()).map(str::to_string) else {
            let mut state = self.lock();
            self.surface_error(&mut state, &FeedError::NotAuthenticated);
            self.publish(&state);
            return Err(FeedError::NotAuthenticated);
        };

        let generation = {
            let mut state = self.lock();
            let generation = self.begin_load(&mut state, &user_id);
            self.publish(&state);
            generation
        };

        tracing::info!(
            "Loading feed for user: {} (exclude previously decided: {})",
            user_id,
            exclude_previously_decided
        );

        let fetched = self.fetch_page(&user_id, exclude_previously_decided).await;
        self.finish_load(generation, fetched).await
    }

    /// Fetch and append another page of candidates
    pub async fn load_more(&self) -> FeedResult<LoadOutcome> {
        let (user, skip) = {
            let mut state = self.lock();
            if state.loading_more {
                tracing::debug!("Load more already in flight, skipping");
                return Ok(LoadOutcome::AlreadyLoading);
            }
            let user = match (&state.current_user, &state.current_user_id) {
                (Some(user), _) => user.clone(),
                (None, Some(_)) => return Err(FeedError::ProfileNotFound),
                (None, None) => return Err(FeedError::NotAuthenticated),
            };
            state.loading_more = true;
            self.publish(&state);
            (user, state.queue.ids_to_skip())
        };

        let result = self
            .inner
            .repository
            .fetch_candidates(&user, self.inner.settings.page_size, &skip)
            .await;

        let new_ids = {
            let mut state = self.lock();
            state.loading_more = false;
            match result {
                Ok(candidates) => {
                    let before: HashSet<String> =
                        state.queue.fetched().iter().map(|p| p.user_id.clone()).collect();
                    state.queue.append(candidates);
                    state.display_limit += self.inner.settings.page_size;
                    self.recompute(&mut state);
                    self.publish(&state);
                    state
                        .queue
                        .fetched()
                        .iter()
                        .filter(|p| !before.contains(&p.user_id))
                        .map(|p| p.user_id.clone())
                        .collect::<Vec<_>>()
                }
                Err(e) => {
                    let err = FeedError::from(e);
                    tracing::warn!("Failed to load more candidates for {}: {}", user.user_id, err);
                    self.surface_error(&mut state, &err);
                    self.publish(&state);
                    return Err(err);
                }
            }
        };

        tracing::debug!("Loaded {} more candidates for {}", new_ids.len(), user.user_id);

        if !new_ids.is_empty() {
            self.inner.presence.prefetch_online_status(&new_ids).await;
        }

        Ok(LoadOutcome::Loaded { count: new_ids.len() })
    }

    /// Start over: forget exclusions, history and today's matches, then reload
    ///
    /// Previously passed profiles can show up again after a refresh.
    pub async fn refresh(&self) -> FeedResult<LoadOutcome> {
        let user_id = {
            let mut state = self.lock();
            state.queue.clear_exclusions();
            state.history.clear();
            state.matches_today = 0;
            self.publish(&state);
            state.current_user_id.clone()
        };

        tracing::info!("Refreshing feed for user: {:?}", user_id);

        self.load(user_id.as_deref(), false).await
    }

    /// Awaited reload with the current exclusion set
    pub(crate) async fn reload(&self) -> FeedResult<LoadOutcome> {
        let user_id = self.lock().current_user_id.clone();
        self.load(user_id.as_deref(), true).await
    }

    /// Reload in the background; a later load cancels it
    pub(crate) fn spawn_reload(&self) {
        let mut state = self.lock();
        let Some(user_id) = state.current_user_id.clone() else {
            return;
        };

        let generation = self.begin_load(&mut state, &user_id);
        self.publish(&state);

        tracing::debug!("Queue low, reloading in background for {}", user_id);

        let feed = self.clone();
        let handle = tokio::spawn(async move {
            let fetched = feed.fetch_page(&user_id, true).await;
            if let Err(e) = feed.finish_load(generation, fetched).await {
                tracing::warn!("Background reload failed for {}: {}", user_id, e);
            }
        });
        state.pending_reload = Some(handle);
    }

    /// Claim the next load generation, cancelling any background load
    fn begin_load(&self, state: &mut FeedState, user_id: &str) -> u64 {
        if let Some(handle) = state.pending_reload.take() {
            handle.abort();
        }
        state.load_generation += 1;
        state.loading = true;
        state.current_user_id = Some(user_id.to_string());
        state.load_generation
    }

    async fn fetch_page(
        &self,
        user_id: &str,
        exclude_previously_decided: bool,
    ) -> FeedResult<FetchedPage> {
        let repository = &self.inner.repository;

        let profile = repository
            .fetch_profile(user_id)
            .await?
            .ok_or(FeedError::ProfileNotFound)?;

        let (exclusions, skip) = if exclude_previously_decided {
            let remote = repository.fetch_excluded_ids(user_id).await?;
            let mut skip: Vec<String> = self.lock().queue.excluded().iter().cloned().collect();
            skip.extend(remote.iter().cloned());
            skip.sort();
            skip.dedup();
            (ExclusionUpdate::Merge(remote), skip)
        } else {
            (ExclusionUpdate::Clear, Vec::new())
        };

        tracing::debug!("Excluding {} decided profiles for user {}", skip.len(), user_id);

        let candidates = repository
            .fetch_candidates(&profile, self.inner.settings.fetch_limit, &skip)
            .await?;

        Ok(FetchedPage {
            profile,
            exclusions,
            candidates,
        })
    }

    /// Apply a finished load unless a newer one started meanwhile
    async fn finish_load(
        &self,
        generation: u64,
        fetched: FeedResult<FetchedPage>,
    ) -> FeedResult<LoadOutcome> {
        let displayed_ids = {
            let mut state = self.lock();
            if state.load_generation != generation {
                tracing::debug!("Dropping results of superseded load {}", generation);
                return Ok(LoadOutcome::Superseded);
            }
            state.loading = false;
            let restored = std::mem::take(&mut state.restored_during_load);

            let page = match fetched {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!("Feed load failed: {}", err);
                    self.surface_error(&mut state, &err);
                    self.publish(&state);
                    return Err(err);
                }
            };

            match page.exclusions {
                ExclusionUpdate::Merge(ids) => state.queue.merge_exclusions(ids),
                ExclusionUpdate::Clear => state.queue.clear_exclusions(),
            }
            state.current_user = Some(page.profile);
            state.queue.replace(page.candidates);
            // Undone after this load read the decisions
            for profile in restored {
                state.queue.unexclude(&profile.user_id);
                state.queue.push_front(profile);
            }
            state.display_limit = self.inner.settings.page_size;
            if state.error == Some(FeedError::NetworkUnavailable) {
                state.error = None;
            }
            self.recompute(&mut state);
            self.publish(&state);

            state
                .queue
                .displayed()
                .iter()
                .map(|p| p.user_id.clone())
                .collect::<Vec<_>>()
        };

        tracing::info!("Loaded {} candidates", displayed_ids.len());

        self.inner.presence.prefetch_online_status(&displayed_ids).await;

        // Presence only becomes known after the prefetch
        {
            let mut state = self.lock();
            if state.criteria.online_only && state.load_generation == generation {
                self.recompute(&mut state);
                self.publish(&state);
            }
        }

        Ok(LoadOutcome::Loaded {
            count: displayed_ids.len(),
        })
    }

    // ---------------------------------------------------------------------
    // Filters and sorting
    // ---------------------------------------------------------------------

    pub fn filters(&self) -> FilterCriteria {
        self.lock().criteria.clone()
    }

    /// Mutate the filter criteria and redisplay
    pub fn update_filters<F>(&self, update: F)
    where
        F: FnOnce(&mut FilterCriteria),
    {
        let query = {
            let mut state = self.lock();
            let mut criteria = state.criteria.clone();
            update(&mut criteria);
            state.criteria = criteria.normalized();
            self.recompute(&mut state);
            self.inner.filters_tx.send_replace(state.criteria.clone());
            self.publish(&state);
            tracing::debug!("Filters updated: {}", state.criteria.signature());
            state.search_query.clone()
        };

        // Search results are keyed by filter signature, so rerun the query
        if let Some(query) = query {
            self.search(&query);
        }
    }

    pub fn set_filters(&self, criteria: FilterCriteria) {
        self.update_filters(|current| *current = criteria);
    }

    pub fn reset_filters(&self) {
        self.set_filters(FilterCriteria::default());
    }

    pub fn set_sort_order(&self, order: SortOrder) {
        let mut state = self.lock();
        state.sort_order = order;
        self.recompute(&mut state);
        self.publish(&state);
    }

    // ---------------------------------------------------------------------
    // Search
    // ---------------------------------------------------------------------

    /// Handle a search keystroke
    ///
    /// Short queries clear the results immediately. Anything else runs after
    /// the debounce delay unless another keystroke arrives first.
    pub fn search(&self, raw_query: &str) {
        let mut state = self.lock();
        if let Some(handle) = state.pending_search.take() {
            handle.abort();
        }
        state.search_generation += 1;
        let generation = state.search_generation;

        let Some(query) = searchable_query(raw_query) else {
            state.search_query = None;
            if state.search_results.take().is_some() {
                self.recompute(&mut state);
                self.publish(&state);
            }
            return;
        };

        state.search_query = Some(query.clone());

        let feed = self.clone();
        let debounce = self.inner.settings.search_debounce;
        state.pending_search = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if let Err(e) = feed.run_search(generation, &query).await {
                tracing::warn!("Search for '{}' failed: {}", query, e);
            }
        }));
    }

    pub fn clear_search(&self) {
        self.search("");
    }

    /// Results of the active search, empty when no search is active
    pub fn search_results(&self) -> Vec<CandidateProfile> {
        self.lock().search_results.clone().unwrap_or_default()
    }

    async fn run_search(&self, generation: u64, query: &str) -> FeedResult<()> {
        let (key, tags) = {
            let mut state = self.lock();
            if state.search_generation != generation {
                return Ok(());
            }

            let key = SearchKey::new(query, state.criteria.signature());
            if let Some(results) = state.search_cache.get(&key, Instant::now()) {
                tracing::debug!("Search cache hit for '{}'", query);
                state.search_results = Some(results);
                self.recompute(&mut state);
                self.publish(&state);
                return Ok(());
            }

            let tags: Vec<String> = state.criteria.content_tags.iter().cloned().collect();
            (key, tags)
        };

        tracing::debug!("Searching profiles for '{}'", query);

        let result = self.inner.repository.search_profiles(query, &tags).await;

        let mut state = self.lock();
        match result {
            Ok(results) => {
                state.search_cache.insert(key, results.clone(), Instant::now());
                if state.search_generation == generation {
                    state.search_results = Some(results);
                    self.recompute(&mut state);
                    self.publish(&state);
                }
                Ok(())
            }
            Err(e) => {
                let err = FeedError::from(e);
                if state.search_generation == generation {
                    self.surface_error(&mut state, &err);
                    self.publish(&state);
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = FeedSettings::default();
        assert_eq!(settings.page_size, 20);
        assert_eq!(settings.low_water_mark, 3);
        assert_eq!(settings.history_cap, 10);
        assert_eq!(settings.error_dismiss_after, Duration::from_secs(3));
        assert_eq!(settings.search_debounce, Duration::from_millis(300));
        assert_eq!(settings.search_cache_ttl, Duration::from_secs(300));
        assert_eq!(settings.search_cache_capacity, 20);
    }
}
