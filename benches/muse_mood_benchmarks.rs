//! # muse-mood Performance Benchmarks
//!
//! ## Benchmark Categories
//!
//! - **Ranking**: Distance ranking over candidate pools of various sizes
//! - **Classification**: Batched linear model predictions
//! - **Caches**: Cache reads and inserts against an on-disk SQLite store
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run specific benchmark group
//! cargo bench ranking
//! cargo bench classification
//! cargo bench caches
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use muse_mood::classifier::{LinearHead, LinearMoodModel, MoodClassifier};
use muse_mood::db::SqliteStore;
use muse_mood::mood::{Mood, MoodPoint};
use muse_mood::ranker::{rank, Recommendation};
use muse_mood::song::{AudioFeatures, ModelInput, Song, MODEL_INPUT_LEN};
use std::hint::black_box;
use tempfile::TempDir;

/// Deterministic pseudo-random value in [0, 1) for benchmark data.
fn unit(i: usize, salt: usize) -> f64 {
    let mixed = (i.wrapping_mul(2_654_435_761) ^ salt.wrapping_mul(40_503)) % 10_000;
    #[allow(clippy::cast_precision_loss)]
    let value = mixed as f64 / 10_000.0;
    value
}

fn create_candidates(count: usize) -> Vec<Recommendation> {
    (0..count)
        .map(|i| Recommendation {
            song_id: format!("song{i}"),
            name: format!("Benchmark Song {i}"),
            excitedness: unit(i, 1) * 2.0 - 1.0,
            happiness: unit(i, 2) * 2.0 - 1.0,
        })
        .collect()
}

fn create_inputs(count: usize) -> Vec<ModelInput> {
    (0..count)
        .map(|i| {
            let mut input = [0.0; MODEL_INPUT_LEN];
            for (j, value) in input.iter_mut().enumerate() {
                *value = unit(i, j);
            }
            input
        })
        .collect()
}

fn create_model() -> LinearMoodModel {
    let head = |salt| LinearHead {
        weights: std::array::from_fn(|j| unit(j, salt) - 0.5),
        intercept: 0.1,
    };
    LinearMoodModel {
        happiness: head(7),
        excitedness: head(11),
    }
}

fn create_song(i: usize) -> Song {
    Song {
        id: format!("song{i}"),
        name: format!("Benchmark Song {i}"),
        features: AudioFeatures {
            energy: Some(unit(i, 3)),
            valence: Some(unit(i, 4)),
            danceability: Some(unit(i, 5)),
            tempo: Some(60.0 + unit(i, 6) * 120.0),
            ..AudioFeatures::default()
        },
    }
}

/// Benchmark candidate ranking
fn benchmark_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");
    let target = MoodPoint::new(0.3, -0.2);

    for size in [10, 50, 500, 5000] {
        let candidates = create_candidates(size);
        group.bench_with_input(BenchmarkId::new("rank_top_10", size), &candidates, |b, candidates| {
            b.iter_batched(
                || candidates.clone(),
                |pool| rank(black_box(pool), black_box(target), 10),
                BatchSize::SmallInput,
            )
        });
    }

    group.bench_function("distance", |b| {
        let a = MoodPoint::new(0.1, 0.9);
        b.iter(|| black_box(a).distance(black_box(target)))
    });

    group.bench_function("mean_of_1000", |b| {
        let points: Vec<MoodPoint> = create_candidates(1000).iter().map(Recommendation::point).collect();
        b.iter(|| MoodPoint::mean(black_box(&points).iter().copied()))
    });

    group.finish();
}

/// Benchmark batched classification
fn benchmark_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");
    let model = create_model();

    for size in [1, 50, 1000] {
        let inputs = create_inputs(size);
        group.bench_with_input(BenchmarkId::new("linear_predict", size), &inputs, |b, inputs| {
            b.iter(|| model.predict(black_box(inputs)))
        });
    }

    group.finish();
}

/// Benchmark cache reads and writes
fn benchmark_caches(c: &mut Criterion) {
    let mut group = c.benchmark_group("caches");

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = SqliteStore::open(&temp_dir.path().join("bench.db")).expect("Failed to open store");
    let ids: Vec<String> = (0..500).map(|i| format!("song{i}")).collect();
    for i in 0..500 {
        store.insert_song_if_absent(&create_song(i)).expect("insert song");
        store
            .insert_mood_if_absent(&format!("song{i}"), Mood { excitedness: unit(i, 8), happiness: unit(i, 9) })
            .expect("insert mood");
    }

    group.bench_function("songs_by_ids_500", |b| {
        b.iter(|| store.songs_by_ids(black_box(&ids)).expect("read songs"))
    });

    group.bench_function("moods_by_ids_500", |b| {
        b.iter(|| store.moods_by_ids(black_box(&ids)).expect("read moods"))
    });

    group.bench_function("insert_existing_song", |b| {
        let song = create_song(0);
        b.iter(|| store.insert_song_if_absent(black_box(&song)).expect("insert song"))
    });

    group.finish();
}

criterion_group!(benches, benchmark_ranking, benchmark_classification, benchmark_caches);

criterion_main!(benches);
