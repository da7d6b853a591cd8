//! End-to-end tests for the recommendation pipeline.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;

use recommendation_engine::services::{
    CollaborativeModel, EmbeddingStore, FactorsArtifact, PopularityTable, RecommendationEngine,
    Strategy,
};
use recommendation_engine::{
    CacheSettings, EngineConfig, ModelConfig, RecommendRequest, ResponseStatus,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Ten articles with ids 10, 20, ..., 100 on the unit circle.
fn corpus() -> Vec<(u64, Vec<f32>)> {
    (0..10)
        .map(|k| {
            let theta = k as f32 * 0.3;
            ((k as u64 + 1) * 10, vec![theta.cos(), theta.sin(), 0.0])
        })
        .collect()
}

fn factors_artifact() -> FactorsArtifact {
    FactorsArtifact {
        global_bias: 0.05,
        user_factors: HashMap::from([(7, vec![1.0, 0.0]), (8, vec![0.0, 1.0])]),
        user_biases: HashMap::from([(7, 0.1)]),
        item_ids: corpus().iter().map(|(id, _)| *id).collect(),
        item_factors: (0..10).map(|k| vec![0.1 * k as f32, 1.0 - 0.1 * k as f32]).collect(),
        item_biases: vec![0.0; 10],
    }
}

fn test_engine() -> RecommendationEngine {
    init_tracing();
    let store = EmbeddingStore::from_pairs(corpus()).unwrap();
    let collaborative = CollaborativeModel::from_artifact(factors_artifact()).unwrap();
    let popularity = PopularityTable::from_counts(
        corpus().iter().map(|(id, _)| (*id, 1000 - *id)).collect(),
    );

    RecommendationEngine::new(
        store,
        Some(collaborative),
        Some(popularity),
        CacheSettings::default(),
    )
    .unwrap()
}

fn request(user_id: i64, history: Vec<i64>, n: i64) -> RecommendRequest {
    RecommendRequest {
        user_id,
        history,
        n_recommendations: n,
    }
}

#[test]
fn cold_start_three_known_items() {
    let engine = test_engine();
    let response = engine.recommend(&request(1, vec![10, 20, 30], 5)).unwrap();

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.strategy, Strategy::ColdStart);
    assert_eq!(response.weights.content, 1.0);
    assert_eq!(response.weights.collaborative, 0.0);
    assert_eq!(response.recommendations.len(), 5);

    let ids: HashSet<u64> = response
        .recommendations
        .iter()
        .map(|r| r.article_id)
        .collect();
    assert_eq!(ids.len(), 5, "no duplicate recommendations");
    for seen in [10, 20, 30] {
        assert!(!ids.contains(&seen), "history item {} surfaced", seen);
    }
    for rec in &response.recommendations {
        assert!((-1.0..=1.0).contains(&rec.score), "cosine out of range");
    }
    // Ranks are 1-based and contiguous.
    let ranks: Vec<usize> = response.recommendations.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
}

#[test]
fn moderate_tier_blends_both_methods() {
    let engine = test_engine();
    // Six interactions, user 7 is known to the factor model.
    let response = engine
        .recommend(&request(7, vec![10, 20, 30, 10, 20, 30], 3))
        .unwrap();

    assert_eq!(response.strategy, Strategy::Moderate);
    assert!((response.weights.content - 0.7).abs() < 1e-6);
    assert!((response.weights.collaborative - 0.3).abs() < 1e-6);
}

#[test]
fn active_tier_weights() {
    let engine = test_engine();
    let history = vec![10; 16];
    let response = engine.recommend(&request(7, history, 3)).unwrap();

    assert_eq!(response.strategy, Strategy::Active);
    assert!((response.weights.content - 0.3).abs() < 1e-6);
    assert!((response.weights.collaborative - 0.7).abs() < 1e-6);
}

#[test]
fn unseen_user_redistributes_weight_to_content() {
    let engine = test_engine();
    // Active tier, but user 999 has no factor row.
    let response = engine.recommend(&request(999, vec![10; 16], 3)).unwrap();

    assert_eq!(response.strategy, Strategy::Active);
    assert_eq!(response.weights.content, 1.0);
    assert_eq!(response.weights.collaborative, 0.0);
    assert!(!response.recommendations.is_empty());
}

#[test]
fn unknown_only_history_serves_popularity() {
    let engine = test_engine();
    let response = engine
        .recommend(&request(1, vec![5000, 6000, 7000], 4))
        .unwrap();

    assert_eq!(response.status, ResponseStatus::Success);
    // Popularity counts are 1000 - id, so lower ids are more popular.
    let ids: Vec<u64> = response
        .recommendations
        .iter()
        .map(|r| r.article_id)
        .collect();
    assert_eq!(ids, vec![10, 20, 30, 40]);
    assert!((response.recommendations[0].score - 0.95).abs() < 1e-6);
}

#[test]
fn zero_n_returns_empty_success() {
    let engine = test_engine();
    let response = engine.recommend(&request(1, vec![10, 20], 0)).unwrap();

    assert_eq!(response.status, ResponseStatus::Success);
    assert!(response.recommendations.is_empty());
}

#[test]
fn oversized_n_returns_all_unseen() {
    let engine = test_engine();
    let response = engine.recommend(&request(1, vec![10, 20, 30], 500)).unwrap();

    // 10 items minus 3 seen.
    assert_eq!(response.recommendations.len(), 7);
    let ids: HashSet<u64> = response
        .recommendations
        .iter()
        .map(|r| r.article_id)
        .collect();
    assert_eq!(ids.len(), 7, "no duplicates");
}

#[test]
fn identical_requests_hit_the_cache() {
    let engine = test_engine();
    let req = request(1, vec![10, 20, 30], 5);

    let first = engine.recommend(&req).unwrap();
    let second = engine.recommend(&req).unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.recommendations, second.recommendations);
    assert_eq!(first.strategy, second.strategy);
    assert_eq!(first.weights, second.weights);
    assert_eq!(engine.stats().cache_hits, 1);
}

#[test]
fn cached_result_equals_fresh_computation() {
    let engine = test_engine();
    let fresh_engine = test_engine();
    let req = request(1, vec![10, 20, 30], 5);

    let _ = engine.recommend(&req).unwrap();
    let cached = engine.recommend(&req).unwrap();
    let fresh = fresh_engine.recommend(&req).unwrap();

    assert!(cached.from_cache);
    assert!(!fresh.from_cache);
    assert_eq!(cached.recommendations, fresh.recommendations);
}

#[test]
fn different_n_is_a_distinct_cache_entry() {
    let engine = test_engine();

    let _ = engine.recommend(&request(1, vec![10, 20, 30], 5)).unwrap();
    let second = engine.recommend(&request(1, vec![10, 20, 30], 7)).unwrap();

    assert!(!second.from_cache);
    assert_eq!(second.recommendations.len(), 7);
}

#[test]
fn negative_n_maps_to_structured_error() {
    let engine = test_engine();
    let response = engine.handle(&request(1, vec![10], -3));

    assert_eq!(response.status, ResponseStatus::Error);
    assert!(response.recommendations.is_empty());
    assert!(response.error.unwrap().contains("n_recommendations"));
}

#[test]
fn concurrent_requests_share_the_engine() {
    let engine = Arc::new(test_engine());

    let mut handles = Vec::new();
    for t in 0..8i64 {
        let engine = Arc::clone(&engine);
        handles.push(std::thread::spawn(move || {
            for i in 0..50i64 {
                let response = engine.handle(&request(t, vec![10, 20, 30 + 10 * (i % 3)], 5));
                assert_eq!(response.status, ResponseStatus::Success);
                assert_eq!(response.recommendations.len(), 5);
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    assert_eq!(engine.stats().total_requests, 8 * 50);
    assert_eq!(engine.stats().errors, 0);
}

#[test]
fn engine_loads_artifacts_from_disk() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let embeddings: HashMap<String, Vec<f32>> = corpus()
        .into_iter()
        .map(|(id, vec)| (id.to_string(), vec))
        .collect();
    let embeddings_path = dir.path().join("embeddings.json");
    write!(
        std::fs::File::create(&embeddings_path).unwrap(),
        "{}",
        serde_json::to_string(&embeddings).unwrap()
    )
    .unwrap();

    let factors_path = dir.path().join("factors.json");
    write!(
        std::fs::File::create(&factors_path).unwrap(),
        "{}",
        serde_json::to_string(&factors_artifact()).unwrap()
    )
    .unwrap();

    let popularity: HashMap<String, u64> =
        corpus().iter().map(|(id, _)| (id.to_string(), 1000 - id)).collect();
    let popularity_path = dir.path().join("popularity.json");
    write!(
        std::fs::File::create(&popularity_path).unwrap(),
        "{}",
        serde_json::to_string(&popularity).unwrap()
    )
    .unwrap();

    let config = EngineConfig {
        model: ModelConfig {
            embeddings_path: embeddings_path.to_str().unwrap().to_string(),
            factors_path: Some(factors_path.to_str().unwrap().to_string()),
            popularity_path: Some(popularity_path.to_str().unwrap().to_string()),
        },
        cache: CacheSettings::default(),
    };

    let engine = RecommendationEngine::load(&config).unwrap();
    let info = engine.model_info();
    assert_eq!(info.content_version, "items:10 dim:3");
    assert_eq!(
        info.collaborative_version.as_deref(),
        Some("users:2 items:10 factors:2")
    );
    assert_eq!(info.popularity_entries, 10);

    let response = engine.recommend(&request(7, vec![10, 20, 30], 5)).unwrap();
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.recommendations.len(), 5);
}
