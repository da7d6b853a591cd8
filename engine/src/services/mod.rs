// ============================================
// Recommendation Engine - Orchestrator
// ============================================
//
// Ties the pieces together, per request:
//   validate → classify strategy → cache lookup
//     → (miss) profile per method → score per method
//     → redistribute weights → combine → exclude history → rank
//     → cache store → response
//
// Models are loaded once and shared read-only; the result cache is the only
// mutable shared state.

pub mod collaborative;
pub mod embedding_store;
pub mod popularity;
pub mod profile;
pub mod ranker;
pub mod scorer;
pub mod stats;
pub mod strategy;

pub use collaborative::{CollaborativeModel, FactorsArtifact};
pub use embedding_store::EmbeddingStore;
pub use popularity::PopularityTable;
pub use stats::{EngineStats, EngineStatsSnapshot};
pub use strategy::{MethodWeights, Strategy};

use chrono::{DateTime, Utc};
use ndarray::Array1;
use once_cell::sync::OnceCell;
use result_cache::{CacheStats, TtlLruCache};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{CacheSettings, EngineConfig};
use crate::error::{EngineError, Result};
use crate::models::{
    ItemId, RankedArticle, RecommendRequest, RecommendResponse, ResponseStatus, UserId,
    ValidatedRequest,
};

static GLOBAL_ENGINE: OnceCell<RecommendationEngine> = OnceCell::new();

/// Cache key: user identity, history fingerprint, requested N and tier.
///
/// Two requests with identical history but different N are distinct
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    user_id: UserId,
    history_hash: u64,
    n: usize,
    strategy: Strategy,
}

impl CacheKey {
    fn new(request: &ValidatedRequest, strategy: Strategy) -> Self {
        let mut hasher = DefaultHasher::new();
        request.history.hash(&mut hasher);
        Self {
            user_id: request.user_id,
            history_hash: hasher.finish(),
            n: request.n,
            strategy,
        }
    }
}

/// Computed outcome memoized by the result cache.
#[derive(Debug, Clone)]
struct CachedRecommendation {
    strategy: Strategy,
    weights: MethodWeights,
    recommendations: Vec<RankedArticle>,
}

/// Model metadata for operational visibility
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub content_version: String,
    pub collaborative_version: Option<String>,
    pub popularity_entries: usize,
    pub loaded_at: DateTime<Utc>,
}

/// The recommendation engine: stateless per-request computation over
/// read-only models, fronted by a bounded result cache.
pub struct RecommendationEngine {
    store: EmbeddingStore,
    collaborative: Option<CollaborativeModel>,
    popularity: Option<PopularityTable>,
    cache: TtlLruCache<CacheKey, CachedRecommendation>,
    stats: EngineStats,
    loaded_at: DateTime<Utc>,
}

impl RecommendationEngine {
    /// Assemble an engine from loaded models, validating cross-artifact
    /// alignment.
    pub fn new(
        store: EmbeddingStore,
        collaborative: Option<CollaborativeModel>,
        popularity: Option<PopularityTable>,
        cache: CacheSettings,
    ) -> Result<Self> {
        if let Some(model) = &collaborative {
            if model.item_ids() != store.ids() {
                return Err(EngineError::CorruptModel(format!(
                    "item id spaces disagree: embeddings have {} items, factors have {}",
                    store.len(),
                    model.n_items()
                )));
            }
        }

        Ok(Self {
            store,
            collaborative,
            popularity,
            cache: TtlLruCache::with_config(cache.capacity, Duration::from_secs(cache.ttl_secs)),
            stats: EngineStats::default(),
            loaded_at: Utc::now(),
        })
    }

    /// Load all model artifacts from disk per the configuration.
    pub fn load(config: &EngineConfig) -> Result<Self> {
        let store = EmbeddingStore::load(&config.model.embeddings_path)?;

        let collaborative = match &config.model.factors_path {
            Some(path) => Some(CollaborativeModel::load(path)?),
            None => {
                info!("no factors artifact configured, collaborative method disabled");
                None
            }
        };

        let popularity = match &config.model.popularity_path {
            Some(path) => Some(PopularityTable::load(path)?),
            None => None,
        };

        Self::new(store, collaborative, popularity, config.cache.clone())
    }

    /// Process-wide engine, loaded at most once even under concurrent
    /// first use. Model loading is a one-time startup cost outside the
    /// request hot path.
    pub fn global(config: &EngineConfig) -> Result<&'static RecommendationEngine> {
        GLOBAL_ENGINE.get_or_try_init(|| Self::load(config))
    }

    /// Produce recommendations, or a structured error.
    pub fn recommend(&self, request: &RecommendRequest) -> Result<RecommendResponse> {
        let started = Instant::now();
        self.stats.record_request();

        let validated = request.validate()?;
        let strategy = Strategy::classify(validated.history.len());
        let key = CacheKey::new(&validated, strategy);

        if let Some(cached) = self.cache.get(&key) {
            self.stats.record_cache_hit();
            debug!(user_id = validated.user_id, "result cache hit");
            self.stats.record_latency(started.elapsed().as_nanos());
            return Ok(self.to_response(request.user_id, cached, true, started));
        }

        let computed = self.compute(&validated, strategy)?;
        self.cache.put(key, computed.clone());
        self.stats.record_latency(started.elapsed().as_nanos());

        debug!(
            user_id = validated.user_id,
            n_recommendations = computed.recommendations.len(),
            "recommendations computed"
        );

        Ok(self.to_response(request.user_id, computed, false, started))
    }

    /// Engine boundary: every error maps to the structured wire status.
    /// Invalid requests carry their reason; anything else degrades to a
    /// generic failure with diagnostics kept in logs only.
    pub fn handle(&self, request: &RecommendRequest) -> RecommendResponse {
        let started = Instant::now();
        match self.recommend(request) {
            Ok(response) => response,
            Err(err) => {
                self.stats.record_error();
                let detail = match &err {
                    EngineError::InvalidRequest(msg) => msg.clone(),
                    other => {
                        error!("recommendation failed: {}", other);
                        "recommendation failed".to_string()
                    }
                };

                let strategy = Strategy::classify(request.history.len());
                RecommendResponse {
                    status: ResponseStatus::Error,
                    user_id: request.user_id,
                    strategy,
                    weights: strategy.weights(),
                    recommendations: Vec::new(),
                    inference_time_ms: elapsed_ms(started),
                    from_cache: false,
                    error: Some(detail),
                }
            }
        }
    }

    fn compute(
        &self,
        request: &ValidatedRequest,
        strategy: Strategy,
    ) -> Result<CachedRecommendation> {
        let tier_weights = strategy.weights();

        let content_scores = match self.content_scores(&request.history) {
            Ok(scores) => Some(scores),
            Err(EngineError::EmptyProfile(method)) => {
                debug!(method, "no usable profile for method");
                None
            }
            Err(err) => return Err(err),
        };

        // Only score the collaborative method when the tier gives it weight.
        let collaborative_scores = if tier_weights.collaborative > 0.0 {
            match self.collaborative_scores(request.user_id) {
                Ok(scores) => Some(scores),
                Err(EngineError::EmptyProfile(method)) => {
                    debug!(method, "no usable profile for method");
                    None
                }
                Err(err) => return Err(err),
            }
        } else {
            None
        };

        let weights = tier_weights.redistribute(
            content_scores.is_some(),
            collaborative_scores.is_some(),
        );

        let recommendations = if content_scores.is_none() && collaborative_scores.is_none() {
            self.popularity_fallback(request)
        } else {
            let combined = scorer::combine_scores(
                content_scores.as_ref(),
                collaborative_scores.as_ref(),
                weights,
            );
            let exclude_rows: HashSet<usize> = request
                .history
                .iter()
                .filter_map(|&id| self.store.row_of(id))
                .collect();
            ranker::rank(combined, &exclude_rows, request.n, self.store.ids())
        };

        Ok(CachedRecommendation {
            strategy,
            weights,
            recommendations,
        })
    }

    fn content_scores(&self, history: &[ItemId]) -> Result<Array1<f32>> {
        let user_profile = profile::build_content_profile(history, &self.store)
            .ok_or(EngineError::EmptyProfile("content"))?;
        Ok(scorer::cosine_scores(&user_profile, self.store.normalized()))
    }

    fn collaborative_scores(&self, user_id: UserId) -> Result<Array1<f32>> {
        let model = self
            .collaborative
            .as_ref()
            .ok_or(EngineError::EmptyProfile("collaborative"))?;
        let (row, bias) = model
            .user_row(user_id)
            .ok_or(EngineError::EmptyProfile("collaborative"))?;
        Ok(model.score_all(row, bias))
    }

    /// No method produced a profile: serve the popularity default,
    /// excluding anything the user has already seen.
    fn popularity_fallback(&self, request: &ValidatedRequest) -> Vec<RankedArticle> {
        let seen: HashSet<ItemId> = request.history.iter().copied().collect();
        match &self.popularity {
            Some(table) => {
                debug!(user_id = request.user_id, "serving popularity fallback");
                table.top_n(request.n, &seen)
            }
            None => {
                warn!(
                    user_id = request.user_id,
                    "no usable profile and no popularity table configured"
                );
                Vec::new()
            }
        }
    }

    fn to_response(
        &self,
        user_id: i64,
        outcome: CachedRecommendation,
        from_cache: bool,
        started: Instant,
    ) -> RecommendResponse {
        RecommendResponse {
            status: ResponseStatus::Success,
            user_id,
            strategy: outcome.strategy,
            weights: outcome.weights,
            recommendations: outcome.recommendations,
            inference_time_ms: elapsed_ms(started),
            from_cache,
            error: None,
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            content_version: format!("items:{} dim:{}", self.store.len(), self.store.dim()),
            collaborative_version: self.collaborative.as_ref().map(|m| {
                format!(
                    "users:{} items:{} factors:{}",
                    m.n_users(),
                    m.n_items(),
                    m.factor_dim()
                )
            }),
            popularity_entries: self.popularity.as_ref().map(|t| t.len()).unwrap_or(0),
            loaded_at: self.loaded_at,
        }
    }

    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop all cached results (e.g. after a model artifact swap).
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
