// ============================================
// Article Recommendation Engine - Crate Root
// ============================================
//
// This crate implements a hybrid article recommendation engine combining:
// 1. Content-Based Filtering (item embeddings + mean user profile)
// 2. Collaborative Filtering (latent factors + bias terms)
// 3. Activity-tier strategy selection (weight blending by history length)
// 4. Deterministic top-N ranking with seen-item exclusion
// 5. Bounded TTL + LRU result caching
//
// Architecture:
//   Request → Result Cache → Profile Builder → Scorer (per method)
//                                  ↓
//                    Strategy Weights → Ranker → Response
//                                  ↓
//                    Popularity fallback (no usable profile)

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::{CacheSettings, EngineConfig, ModelConfig};
pub use error::{EngineError, Result};
pub use models::{RankedArticle, RecommendRequest, RecommendResponse, ResponseStatus};
pub use services::{
    CollaborativeModel, EmbeddingStore, EngineStatsSnapshot, MethodWeights, ModelInfo,
    PopularityTable, RecommendationEngine, Strategy,
};
