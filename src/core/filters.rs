use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use crate::core::ports::PresenceService;
use crate::models::{CandidateProfile, SortOrder};

/// Lowest age the age filter can select
pub const AGE_FLOOR: u8 = 18;
/// Highest age the age filter can select
pub const AGE_CEILING: u8 = 99;
/// Max distance value meaning "no limit"
pub const DISTANCE_NO_LIMIT_KM: u16 = 100;

/// User-controlled narrowing of the fetched candidate list
///
/// The age bounds always satisfy `min_age < max_age`; the setters drag the
/// opposite bound along to keep a one-year gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(rename = "minAge")]
    min_age: u8,
    #[serde(rename = "maxAge")]
    max_age: u8,
    #[serde(rename = "verifiedOnly")]
    pub verified_only: bool,
    #[serde(rename = "onlineOnly")]
    pub online_only: bool,
    #[serde(rename = "maxDistanceKm")]
    pub max_distance_km: u16,
    #[serde(rename = "contentTags")]
    pub content_tags: BTreeSet<String>,
    #[serde(rename = "collaborationTypes")]
    pub collaboration_types: BTreeSet<String>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_age: AGE_FLOOR,
            max_age: AGE_CEILING,
            verified_only: false,
            online_only: false,
            max_distance_km: DISTANCE_NO_LIMIT_KM,
            content_tags: BTreeSet::new(),
            collaboration_types: BTreeSet::new(),
        }
    }
}

impl FilterCriteria {
    pub fn min_age(&self) -> u8 {
        self.min_age
    }

    pub fn max_age(&self) -> u8 {
        self.max_age
    }

    pub fn set_min_age(&mut self, age: u8) {
        self.min_age = age.clamp(AGE_FLOOR, AGE_CEILING - 1);
        if self.max_age <= self.min_age {
            self.max_age = self.min_age + 1;
        }
    }

    pub fn set_max_age(&mut self, age: u8) {
        self.max_age = age.clamp(AGE_FLOOR + 1, AGE_CEILING);
        if self.min_age >= self.max_age {
            self.min_age = self.max_age - 1;
        }
    }

    pub fn set_age_range(&mut self, min_age: u8, max_age: u8) {
        self.set_min_age(min_age);
        self.set_max_age(max_age);
    }

    /// Re-establish the age invariant after deserialization
    pub fn normalized(mut self) -> Self {
        let (min, max) = (self.min_age, self.max_age);
        self.min_age = AGE_FLOOR;
        self.max_age = AGE_CEILING;
        self.set_age_range(min, max);
        self
    }

    pub fn is_age_filter_active(&self) -> bool {
        self.min_age > AGE_FLOOR || self.max_age < AGE_CEILING
    }

    pub fn is_distance_filter_active(&self) -> bool {
        self.max_distance_km < DISTANCE_NO_LIMIT_KM
    }

    pub fn has_active_filters(&self) -> bool {
        self.is_age_filter_active()
            || self.is_distance_filter_active()
            || self.verified_only
            || self.online_only
            || !self.content_tags.is_empty()
            || !self.collaboration_types.is_empty()
    }

    /// Stable text form of the active filters, used as part of search cache keys
    pub fn signature(&self) -> String {
        let mut parts = Vec::new();

        if self.is_age_filter_active() {
            parts.push(format!("age:{}-{}", self.min_age, self.max_age));
        }
        if self.verified_only {
            parts.push("verified".to_string());
        }
        if self.online_only {
            parts.push("online".to_string());
        }
        if self.is_distance_filter_active() {
            parts.push(format!("dist:{}", self.max_distance_km));
        }
        if !self.content_tags.is_empty() {
            let tags: Vec<&str> = self.content_tags.iter().map(String::as_str).collect();
            parts.push(format!("tags:{}", tags.join(",")));
        }
        if !self.collaboration_types.is_empty() {
            let types: Vec<&str> = self.collaboration_types.iter().map(String::as_str).collect();
            parts.push(format!("collab:{}", types.join(",")));
        }

        if parts.is_empty() {
            "none".to_string()
        } else {
            parts.join("|")
        }
    }
}

/// Check a candidate against every active filter
///
/// Predicates run cheapest first and stop at the first failure. The online
/// check goes to the presence collaborator, so it runs late.
#[inline]
pub fn matches_criteria(
    profile: &CandidateProfile,
    criteria: &FilterCriteria,
    presence: &dyn PresenceService,
) -> bool {
    // Age fails closed once an age filter is set
    if criteria.is_age_filter_active() {
        match profile.age {
            Some(age) if age >= criteria.min_age && age <= criteria.max_age => {}
            _ => return false,
        }
    }

    if !criteria.content_tags.is_empty()
        && criteria.content_tags.is_disjoint(&profile.content_tags) {
        return false;
    }

    if !criteria.collaboration_types.is_empty()
        && criteria.collaboration_types.is_disjoint(&profile.collaboration_types) {
        return false;
    }

    if criteria.verified_only && !profile.is_verified {
        return false;
    }

    if criteria.online_only && !presence.is_online(&profile.user_id) {
        return false;
    }

    if criteria.is_distance_filter_active() && !profile.is_nearby() {
        return false;
    }

    true
}

/// Derive the displayed list from the fetched list without touching it
pub fn apply_filters(
    profiles: &[CandidateProfile],
    criteria: &FilterCriteria,
    presence: &dyn PresenceService,
) -> Vec<CandidateProfile> {
    profiles
        .iter()
        .filter(|profile| matches_criteria(profile, criteria, presence))
        .cloned()
        .collect()
}

/// Reorder in place. All orders are stable.
pub fn sort_profiles(profiles: &mut [CandidateProfile], order: SortOrder) {
    match order {
        SortOrder::Relevance => {}
        SortOrder::Newest => profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Followers => profiles.sort_by(|a, b| b.follower_count.cmp(&a.follower_count)),
        SortOrder::Distance => profiles.sort_by_key(|p| !p.is_nearby()),
    }
}
