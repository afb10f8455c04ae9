use std::collections::HashSet;
use crate::models::CandidateProfile;

/// Queue size below which a background refill starts
pub const DEFAULT_LOW_WATER_MARK: usize = 3;

/// Swipeable candidates plus the ids that must not come back
///
/// `fetched` is what the repository returned; `displayed` is the filtered and
/// sorted view the user swipes through. An id never sits in the queue and the
/// exclusion set at the same time outside an in-flight swipe.
#[derive(Debug, Clone, Default)]
pub struct CandidateQueue {
    fetched: Vec<CandidateProfile>,
    displayed: Vec<CandidateProfile>,
    excluded: HashSet<String>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetched(&self) -> &[CandidateProfile] {
        &self.fetched
    }

    pub fn displayed(&self) -> &[CandidateProfile] {
        &self.displayed
    }

    pub fn excluded(&self) -> &HashSet<String> {
        &self.excluded
    }

    /// Number of swipeable candidates
    pub fn len(&self) -> usize {
        self.displayed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displayed.is_empty()
    }

    pub fn is_excluded(&self, user_id: &str) -> bool {
        self.excluded.contains(user_id)
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.displayed.iter().any(|p| p.user_id == user_id)
            || self.fetched.iter().any(|p| p.user_id == user_id)
    }

    pub fn is_fetched(&self, user_id: &str) -> bool {
        self.fetched.iter().any(|p| p.user_id == user_id)
    }

    pub fn find(&self, user_id: &str) -> Option<&CandidateProfile> {
        self.displayed.iter().find(|p| p.user_id == user_id)
    }

    /// Replace the fetched list wholesale, dropping excluded and duplicate ids
    pub fn replace(&mut self, candidates: Vec<CandidateProfile>) {
        self.fetched.clear();
        self.append(candidates);
    }

    /// Append a further page, returning how many candidates were new
    pub fn append(&mut self, candidates: Vec<CandidateProfile>) -> usize {
        let mut seen: HashSet<String> = self.fetched.iter().map(|p| p.user_id.clone()).collect();
        let before = self.fetched.len();

        for candidate in candidates {
            if self.excluded.contains(&candidate.user_id) || !seen.insert(candidate.user_id.clone()) {
                continue;
            }
            self.fetched.push(candidate);
        }

        self.fetched.len() - before
    }

    pub fn set_displayed(&mut self, displayed: Vec<CandidateProfile>) {
        self.displayed = displayed;
    }

    /// Remove a candidate from the queue, wherever it is
    pub fn remove(&mut self, user_id: &str) -> Option<CandidateProfile> {
        let from_displayed = self
            .displayed
            .iter()
            .position(|p| p.user_id == user_id)
            .map(|i| self.displayed.remove(i));
        let from_fetched = self
            .fetched
            .iter()
            .position(|p| p.user_id == user_id)
            .map(|i| self.fetched.remove(i));

        from_displayed.or(from_fetched)
    }

    /// Put a candidate back at the front so it is the next one shown
    pub fn push_front(&mut self, profile: CandidateProfile) {
        if !self.fetched.iter().any(|p| p.user_id == profile.user_id) {
            self.fetched.insert(0, profile.clone());
        }
        if !self.displayed.iter().any(|p| p.user_id == profile.user_id) {
            self.displayed.insert(0, profile);
        }
    }

    /// Put a candidate at the front of the displayed view only
    ///
    /// Used for profiles that never came from a fetch, such as search results.
    pub fn show_first(&mut self, profile: CandidateProfile) {
        if !self.displayed.iter().any(|p| p.user_id == profile.user_id) {
            self.displayed.insert(0, profile);
        }
    }

    pub fn exclude(&mut self, user_id: &str) -> bool {
        self.excluded.insert(user_id.to_string())
    }

    pub fn unexclude(&mut self, user_id: &str) -> bool {
        self.excluded.remove(user_id)
    }

    pub fn merge_exclusions<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.excluded.extend(ids);
    }

    pub fn clear_exclusions(&mut self) {
        self.excluded.clear();
    }

    /// Ids a further page must not return: excluded plus already fetched
    pub fn ids_to_skip(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.excluded.iter().cloned().collect();
        ids.extend(self.fetched.iter().map(|p| p.user_id.clone()));
        ids.sort();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn candidate(id: &str) -> CandidateProfile {
        CandidateProfile {
            user_id: id.to_string(),
            display_name: id.to_uppercase(),
            age: Some(28),
            location: None,
            content_tags: BTreeSet::new(),
            collaboration_types: BTreeSet::new(),
            is_verified: true,
            follower_count: 100,
            media_urls: vec![],
            created_at: Utc::now(),
        }
    }

    fn queue_with(ids: &[&str]) -> CandidateQueue {
        let mut queue = CandidateQueue::new();
        queue.replace(ids.iter().map(|id| candidate(id)).collect());
        queue.set_displayed(queue.fetched().to_vec());
        queue
    }

    fn displayed_ids(queue: &CandidateQueue) -> Vec<&str> {
        queue.displayed().iter().map(|p| p.user_id.as_str()).collect()
    }

    #[test]
    fn test_replace_skips_excluded_and_duplicates() {
        let mut queue = CandidateQueue::new();
        queue.exclude("b");
        queue.replace(vec![candidate("a"), candidate("b"), candidate("a"), candidate("c")]);

        let fetched: Vec<&str> = queue.fetched().iter().map(|p| p.user_id.as_str()).collect();
        assert_eq!(fetched, vec!["a", "c"]);
    }

    #[test]
    fn test_append_counts_new_candidates() {
        let mut queue = queue_with(&["a", "b"]);
        let added = queue.append(vec![candidate("b"), candidate("c")]);
        assert_eq!(added, 1);
        assert_eq!(queue.fetched().len(), 3);
    }

    #[test]
    fn test_remove_and_push_front() {
        let mut queue = queue_with(&["a", "b", "c"]);
        let removed = queue.remove("a").unwrap();
        assert_eq!(displayed_ids(&queue), vec!["b", "c"]);
        assert!(!queue.contains("a"));

        queue.push_front(removed);
        assert_eq!(displayed_ids(&queue), vec!["a", "b", "c"]);
        assert_eq!(queue.fetched()[0].user_id, "a");

        // Pushing a present candidate is a no-op
        queue.push_front(candidate("a"));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_show_first_leaves_fetched_alone() {
        let mut queue = queue_with(&["a", "b"]);
        queue.show_first(candidate("s"));

        assert_eq!(displayed_ids(&queue), vec!["s", "a", "b"]);
        assert!(!queue.is_fetched("s"));
        assert!(queue.contains("s"));
    }

    #[test]
    fn test_ids_to_skip() {
        let mut queue = queue_with(&["a", "b"]);
        queue.exclude("z");
        queue.exclude("a");
        assert_eq!(queue.ids_to_skip(), vec!["a", "b", "z"]);
    }
}
