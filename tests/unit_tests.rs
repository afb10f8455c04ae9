// Unit tests for Lume Discovery

use async_trait::async_trait;
use chrono::{Duration, Utc};
use lume_discovery::core::{
    apply_filters,
    distance::{bounding_box, haversine_distance, is_within_bounding_box},
    filters::{AGE_CEILING, AGE_FLOOR, DISTANCE_NO_LIMIT_KM},
    matches_criteria, sort_profiles, CandidateQueue, FilterCriteria, PresenceService, SwipeHistory,
};
use lume_discovery::models::{
    CandidateProfile, Location, SortOrder, SwipeAction, SwipeDecision, SwipeHistoryEntry,
};
use std::collections::BTreeSet;

struct NobodyOnline;

#[async_trait]
impl PresenceService for NobodyOnline {
    async fn prefetch_online_status(&self, _user_ids: &[String]) {}

    fn is_online(&self, _user_id: &str) -> bool {
        false
    }
}

fn create_test_profile(id: &str) -> CandidateProfile {
    CandidateProfile {
        user_id: id.to_string(),
        display_name: format!("Creator {}", id),
        age: Some(28),
        location: None,
        content_tags: BTreeSet::new(),
        collaboration_types: BTreeSet::new(),
        is_verified: false,
        follower_count: 0,
        media_urls: vec![],
        created_at: Utc::now(),
    }
}

fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn nearby(mut profile: CandidateProfile, is_nearby: bool) -> CandidateProfile {
    profile.location = Some(Location {
        city: Some("Berlin".to_string()),
        state: None,
        country: Some("DE".to_string()),
        latitude: 52.52,
        longitude: 13.405,
        is_nearby,
    });
    profile
}

fn ids(profiles: &[CandidateProfile]) -> Vec<&str> {
    profiles.iter().map(|p| p.user_id.as_str()).collect()
}

#[test]
fn test_haversine_distance_zero() {
    let distance = haversine_distance(52.5200, 13.4050, 52.5200, 13.4050);
    assert!(distance < 0.01);
}

#[test]
fn test_bounding_box_spans_radius() {
    let bbox = bounding_box(52.5200, 13.4050, 10.0);

    assert!(is_within_bounding_box(52.5200, 13.4050, &bbox));
    assert!(!is_within_bounding_box(bbox.max_lat + 0.01, 13.4050, &bbox));

    // 10km / 111km per degree
    let lat_span = bbox.max_lat - bbox.min_lat;
    assert!((lat_span - 0.18).abs() < 0.02);
}

#[test]
fn test_default_criteria_pass_everything() {
    let criteria = FilterCriteria::default();
    let mut no_age = create_test_profile("a");
    no_age.age = None;

    assert!(!criteria.has_active_filters());
    assert_eq!(criteria.signature(), "none");
    assert!(matches_criteria(&no_age, &criteria, &NobodyOnline));
}

#[test]
fn test_age_bounds_are_clamped() {
    let mut criteria = FilterCriteria::default();

    criteria.set_min_age(10);
    assert_eq!(criteria.min_age(), AGE_FLOOR);

    criteria.set_max_age(120);
    assert_eq!(criteria.max_age(), AGE_CEILING);

    criteria.set_min_age(40);
    criteria.set_max_age(30);
    assert!(criteria.min_age() < criteria.max_age());
    assert_eq!(criteria.max_age(), 30);
}

#[test]
fn test_missing_age_fails_active_age_filter() {
    let mut criteria = FilterCriteria::default();
    criteria.set_age_range(25, 30);

    let mut no_age = create_test_profile("a");
    no_age.age = None;

    assert!(!matches_criteria(&no_age, &criteria, &NobodyOnline));
    assert!(matches_criteria(&create_test_profile("b"), &criteria, &NobodyOnline));
}

#[test]
fn test_tag_and_collaboration_filters_intersect() {
    let mut criteria = FilterCriteria::default();
    criteria.content_tags = tags(&["Music", "Art"]);
    criteria.collaboration_types = tags(&["Duet"]);

    let mut both = create_test_profile("both");
    both.content_tags = tags(&["Art", "Travel"]);
    both.collaboration_types = tags(&["Duet", "Podcast"]);

    let mut tags_only = create_test_profile("tags_only");
    tags_only.content_tags = tags(&["Music"]);

    let result = apply_filters(&[both, tags_only], &criteria, &NobodyOnline);
    assert_eq!(ids(&result), vec!["both"]);
}

#[test]
fn test_distance_filter_uses_nearby_hint() {
    let mut criteria = FilterCriteria::default();
    assert!(!criteria.is_distance_filter_active());
    assert_eq!(criteria.max_distance_km, DISTANCE_NO_LIMIT_KM);

    criteria.max_distance_km = 25;
    let profiles = vec![
        nearby(create_test_profile("near"), true),
        nearby(create_test_profile("far"), false),
        create_test_profile("unknown"),
    ];

    let result = apply_filters(&profiles, &criteria, &NobodyOnline);
    assert_eq!(ids(&result), vec!["near"]);
}

#[test]
fn test_filters_leave_input_untouched() {
    let mut criteria = FilterCriteria::default();
    criteria.verified_only = true;
    let profiles = vec![create_test_profile("a"), create_test_profile("b")];

    let result = apply_filters(&profiles, &criteria, &NobodyOnline);

    assert!(result.is_empty());
    assert_eq!(profiles.len(), 2);
}

#[test]
fn test_sort_orders() {
    let now = Utc::now();
    let mut old = nearby(create_test_profile("old"), false);
    old.created_at = now - Duration::days(3);
    old.follower_count = 900;
    let mut new = nearby(create_test_profile("new"), true);
    new.created_at = now;
    new.follower_count = 10;
    let mut mid = create_test_profile("mid");
    mid.created_at = now - Duration::days(1);
    mid.follower_count = 500;

    let base = vec![old, new, mid];

    let mut profiles = base.clone();
    sort_profiles(&mut profiles, SortOrder::Relevance);
    assert_eq!(ids(&profiles), vec!["old", "new", "mid"]);

    sort_profiles(&mut profiles, SortOrder::Newest);
    assert_eq!(ids(&profiles), vec!["new", "mid", "old"]);

    sort_profiles(&mut profiles, SortOrder::Followers);
    assert_eq!(ids(&profiles), vec!["old", "mid", "new"]);

    let mut profiles = base;
    sort_profiles(&mut profiles, SortOrder::Distance);
    assert_eq!(ids(&profiles), vec!["new", "old", "mid"]);
}

#[test]
fn test_queue_skips_excluded_and_duplicates() {
    let mut queue = CandidateQueue::new();
    queue.exclude("b");

    let added = queue.append(vec![
        create_test_profile("a"),
        create_test_profile("b"),
        create_test_profile("a"),
        create_test_profile("c"),
    ]);

    assert_eq!(added, 2);
    assert_eq!(ids(queue.fetched()), vec!["a", "c"]);
    assert_eq!(queue.ids_to_skip(), vec!["a", "b", "c"]);
}

#[test]
fn test_history_evicts_oldest() {
    let mut history = SwipeHistory::new(2);
    let entry = |target: &str| {
        SwipeHistoryEntry::new(
            SwipeDecision::new("me", target, SwipeAction::Pass),
            create_test_profile(target),
        )
    };

    assert!(history.push(entry("a")).is_none());
    assert!(history.push(entry("b")).is_none());
    let evicted = history.push(entry("c")).unwrap();

    assert_eq!(evicted.decision.target_user_id, "a");
    assert_eq!(history.len(), 2);
    assert_eq!(history.last().unwrap().decision.target_user_id, "c");
}
