// Criterion benchmarks for Lume Discovery

use async_trait::async_trait;
use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lume_discovery::core::distance::{bounding_box, haversine_distance};
use lume_discovery::core::{apply_filters, sort_profiles, FilterCriteria, PresenceService};
use lume_discovery::models::{CandidateProfile, Location, SortOrder};
use std::collections::BTreeSet;

struct EveryOtherOnline;

#[async_trait]
impl PresenceService for EveryOtherOnline {
    async fn prefetch_online_status(&self, _user_ids: &[String]) {}

    fn is_online(&self, user_id: &str) -> bool {
        user_id.len() % 2 == 0
    }
}

const TAGS: [&str; 5] = ["Music", "Art", "Gaming", "Fitness", "Travel"];

fn create_candidate(id: usize) -> CandidateProfile {
    CandidateProfile {
        user_id: id.to_string(),
        display_name: format!("Creator {}", id),
        age: Some(18 + (id % 40) as u8),
        location: Some(Location {
            city: None,
            state: None,
            country: None,
            latitude: 52.52 + (id as f64 * 0.001) % 0.5,
            longitude: 13.405 + (id as f64 * 0.001) % 0.5,
            is_nearby: id % 3 != 0,
        }),
        content_tags: [TAGS[id % 5], TAGS[(id + 2) % 5]].iter().map(|t| t.to_string()).collect(),
        collaboration_types: BTreeSet::new(),
        is_verified: id % 4 == 0,
        follower_count: (id as u64 * 7919) % 100_000,
        media_urls: vec![],
        created_at: Utc::now() - Duration::minutes(id as i64),
    }
}

fn create_criteria() -> FilterCriteria {
    let mut criteria = FilterCriteria::default();
    criteria.set_age_range(21, 35);
    criteria.max_distance_km = 50;
    criteria.content_tags = ["Music".to_string(), "Art".to_string()].into_iter().collect();
    criteria
}

fn bench_haversine_distance(c: &mut Criterion) {
    c.bench_function("haversine_distance", |b| {
        b.iter(|| {
            haversine_distance(
                black_box(52.5200),
                black_box(13.4050),
                black_box(52.3906),
                black_box(13.0645),
            )
        });
    });
}

fn bench_bounding_box(c: &mut Criterion) {
    c.bench_function("bounding_box_calculation", |b| {
        b.iter(|| bounding_box(black_box(52.5200), black_box(13.4050), black_box(50.0)));
    });
}

fn bench_filtering(c: &mut Criterion) {
    let criteria = create_criteria();
    let presence = EveryOtherOnline;

    let mut group = c.benchmark_group("apply_filters");

    for candidate_count in [20, 50, 100, 500].iter() {
        let candidates: Vec<CandidateProfile> = (0..*candidate_count).map(create_candidate).collect();

        group.bench_with_input(
            BenchmarkId::new("filters", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| apply_filters(black_box(&candidates), black_box(&criteria), &presence));
            },
        );
    }

    group.finish();
}

fn bench_sorting(c: &mut Criterion) {
    let candidates: Vec<CandidateProfile> = (0..100).map(create_candidate).collect();

    let mut group = c.benchmark_group("sort_profiles");

    for order in [SortOrder::Newest, SortOrder::Followers, SortOrder::Distance] {
        group.bench_with_input(BenchmarkId::new("order", format!("{:?}", order)), &order, |b, order| {
            b.iter(|| {
                let mut profiles = candidates.clone();
                sort_profiles(&mut profiles, *order);
                black_box(profiles)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_haversine_distance,
    bench_bounding_box,
    bench_filtering,
    bench_sorting
);

criterion_main!(benches);
