//! Swipe processing and undo.
//!
//! Each decision moves through `optimistic -> persisted` or
//! `optimistic -> rolled back`. The optimistic step runs before any I/O; every
//! optimistic mutation has a compensating step that runs if the repository
//! rejects the write.

use chrono::Utc;
use uuid::Uuid;

use crate::core::errors::{FeedError, FeedResult};
use crate::core::feed::{DiscoveryFeed, FeedEvent, FeedState};
use crate::models::{CandidateProfile, Match, SwipeAction, SwipeDecision, SwipeHistoryEntry};

/// Result of a persisted swipe
#[derive(Debug, Clone, PartialEq)]
pub struct SwipeOutcome {
    /// History entry to pass to `undo_swipe`
    pub entry_id: Uuid,
    pub matched: Option<Match>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    Restored,
    /// Nothing to undo: unknown entry, not yet persisted, or not the latest
    Ignored,
}

/// Local changes made before the repository write, kept so they can be reversed
struct OptimisticSwipe {
    entry_id: Uuid,
    decision: SwipeDecision,
    /// Whether the profile came from the fetched candidates rather than search
    from_fetched: bool,
}

impl OptimisticSwipe {
    fn apply(state: &mut FeedState, user_id: String, profile: &CandidateProfile, action: SwipeAction) -> Self {
        let from_fetched = state.queue.is_fetched(&profile.user_id);
        state.queue.exclude(&profile.user_id);
        state.restored_during_load.retain(|p| p.user_id != profile.user_id);

        let decision = SwipeDecision::new(user_id, profile.user_id.clone(), action);
        let entry = SwipeHistoryEntry::new(decision.clone(), profile.clone());
        let entry_id = entry.id;
        if let Some(evicted) = state.history.push(entry) {
            tracing::trace!("History full, evicted swipe on {}", evicted.decision.target_user_id);
        }

        state.queue.remove(&profile.user_id);

        Self {
            entry_id,
            decision,
            from_fetched,
        }
    }

    fn roll_back(&self, state: &mut FeedState, profile: &CandidateProfile) {
        state.queue.unexclude(&profile.user_id);
        if self.from_fetched {
            state.queue.push_front(profile.clone());
        } else {
            state.queue.show_first(profile.clone());
        }
        if state.loading && self.from_fetched {
            state.restored_during_load.push(profile.clone());
        }
        state.history.remove(self.entry_id);
    }
}

impl DiscoveryFeed {
    /// Decide on a candidate
    ///
    /// The candidate leaves the queue immediately. If the repository write
    /// fails it is put back at the front and the error is surfaced. A profile
    /// that is no longer queued is rejected with `CandidateUnavailable`.
    pub async fn handle_swipe(
        &self,
        profile: &CandidateProfile,
        action: SwipeAction,
    ) -> FeedResult<SwipeOutcome> {
        let swipe = {
            let mut state = self.lock();
            let Some(user_id) = state.current_user_id.clone() else {
                tracing::warn!("Swipe on {} without a signed in user", profile.user_id);
                self.surface_error(&mut state, &FeedError::NotAuthenticated);
                self.publish(&state);
                return Err(FeedError::NotAuthenticated);
            };
            if state.queue.is_excluded(&profile.user_id) || !state.queue.contains(&profile.user_id) {
                tracing::debug!("Swipe on {} ignored: not in the queue", profile.user_id);
                return Err(FeedError::CandidateUnavailable(profile.user_id.clone()));
            }
            let swipe = OptimisticSwipe::apply(&mut state, user_id, profile, action);
            self.publish(&state);
            swipe
        };

        tracing::debug!(
            "Swipe {} -> {} ({})",
            swipe.decision.user_id,
            swipe.decision.target_user_id,
            action.as_str()
        );

        if let Err(e) = self.inner.repository.record_decision(&swipe.decision).await {
            let err = FeedError::from(e);
            tracing::warn!("Failed to record swipe on {}, rolling back: {}", profile.user_id, err);

            let mut state = self.lock();
            swipe.roll_back(&mut state, profile);
            self.surface_error(&mut state, &err);
            self.publish(&state);
            return Err(err);
        }

        {
            let mut state = self.lock();
            state.history.mark_persisted(swipe.entry_id);
            self.publish(&state);
        }

        let matched = if action.is_positive() {
            self.detect_match(&swipe.decision, profile).await
        } else {
            None
        };

        let remaining = self.lock().queue.len();
        if remaining == 0 {
            // Awaited so a second depletion cannot start a competing reload
            if let Err(e) = self.reload().await {
                tracing::warn!("Reload after emptying the queue failed: {}", e);
            }
        } else if remaining < self.inner.settings.low_water_mark {
            self.spawn_reload();
        }

        Ok(SwipeOutcome {
            entry_id: swipe.entry_id,
            matched,
        })
    }

    async fn detect_match(&self, decision: &SwipeDecision, profile: &CandidateProfile) -> Option<Match> {
        let detected = self
            .inner
            .matcher
            .detect(
                self.inner.repository.as_ref(),
                &decision.user_id,
                &decision.target_user_id,
            )
            .await;

        let matched = match detected {
            Ok(Some(matched)) => matched,
            Ok(None) => return None,
            Err(e) => {
                // The swipe itself is persisted; a failed lookup only loses the signal
                tracing::warn!("Match lookup failed for {}: {}", decision.target_user_id, e);
                return None;
            }
        };

        tracing::info!("Match found: {} <-> {}", decision.user_id, decision.target_user_id);

        let mut state = self.lock();
        let today = Utc::now().date_naive();
        if state.matches_day != today {
            state.matches_day = today;
            state.matches_today = 0;
        }
        state.matches_today += 1;
        let _ = self.inner.events_tx.send(FeedEvent::MatchFound {
            profile: profile.clone(),
            matched: matched.clone(),
        });
        self.publish(&state);

        Some(matched)
    }

    /// Reverse a swipe
    ///
    /// Only the most recent, persisted entry can be undone; anything else is
    /// logged and ignored. If the repository cannot delete the decision the
    /// feed returns to exactly its pre-undo state.
    pub async fn undo_swipe(&self, entry: &SwipeHistoryEntry) -> FeedResult<UndoOutcome> {
        let current = {
            let mut state = self.lock();
            let Some(current) = state.history.get(entry.id).cloned() else {
                tracing::info!("Undo ignored: swipe {} is not in history", entry.id);
                return Ok(UndoOutcome::Ignored);
            };
            if !current.is_persisted() {
                tracing::info!("Undo ignored: swipe {} has no persisted decision", entry.id);
                return Ok(UndoOutcome::Ignored);
            }
            if !state.history.is_last(entry.id) {
                tracing::info!("Undo ignored: swipe {} is not the most recent", entry.id);
                return Ok(UndoOutcome::Ignored);
            }

            let target = &current.decision.target_user_id;
            state.queue.unexclude(target);
            state.history.remove(current.id);
            state.queue.push_front(current.profile.clone());
            if state.loading {
                // The in-flight load skipped this id; finish_load puts it back
                state.restored_during_load.push(current.profile.clone());
            }
            self.publish(&state);
            current
        };

        let decision = &current.decision;
        let deleted = self
            .inner
            .repository
            .delete_decision(&decision.user_id, &decision.target_user_id)
            .await;

        match deleted {
            Ok(()) => {
                tracing::info!("Undid swipe {} -> {}", decision.user_id, decision.target_user_id);
                Ok(UndoOutcome::Restored)
            }
            Err(e) => {
                let err = FeedError::from(e);
                tracing::warn!("Failed to undo swipe on {}, restoring: {}", decision.target_user_id, err);

                let mut state = self.lock();
                state
                    .restored_during_load
                    .retain(|p| p.user_id != decision.target_user_id);
                state.queue.exclude(&decision.target_user_id);
                state.history.push(current.clone());
                state.queue.remove(&decision.target_user_id);
                self.surface_error(&mut state, &err);
                self.publish(&state);
                Err(err)
            }
        }
    }

    /// Undo the most recent swipe, if any
    pub async fn undo_last(&self) -> FeedResult<UndoOutcome> {
        match self.last_swipe() {
            Some(entry) => self.undo_swipe(&entry).await,
            None => Ok(UndoOutcome::Ignored),
        }
    }
}
