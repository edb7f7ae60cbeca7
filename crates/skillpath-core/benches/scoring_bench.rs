//! # Scoring Benchmarks
//!
//! Run with: `cargo bench -p skillpath-core`

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use skillpath_core::{
    AssessmentEngine, AssessmentRequest, MemoryStore, ProficiencyUpdate, score,
    update_proficiency,
};
use skillpath_core::{SkillStore, UserId};
use std::hint::black_box;

/// A store holding `size` records for user `1`, proficiencies spread over 0..=100.
fn populated_store(size: usize) -> MemoryStore {
    let mut store = MemoryStore::new();
    for i in 0..size {
        let value = (i * 37 % 101) as i64;
        let update = ProficiencyUpdate::parse("1", &i.to_string(), value).expect("parse");
        update_proficiency(&mut store, &update, Utc::now()).expect("update");
    }
    store
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");
    let user = UserId::new("1").expect("user");

    for size in [10, 100, 500] {
        let records = populated_store(size).user_skills(&user).expect("records");
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| score(black_box(records)));
        });
    }

    group.finish();
}

fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare");

    for size in [10, 100, 500] {
        let store = populated_store(size);
        let ids: Vec<String> = (0..size).map(|i| i.to_string()).collect();
        let request = AssessmentRequest::parse("1", &ids).expect("request");
        group.bench_with_input(BenchmarkId::from_parameter(size), &request, |b, request| {
            b.iter(|| AssessmentEngine::prepare(&store, black_box(request), Utc::now()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_score, bench_prepare);
criterion_main!(benches);
