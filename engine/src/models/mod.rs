//! Typed request/response models for the engine boundary.
//!
//! The transport layer deserializes incoming JSON into [`RecommendRequest`]
//! and serializes [`RecommendResponse`] back out; everything is validated
//! here before it reaches the scoring path.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::services::strategy::{MethodWeights, Strategy};

/// Article identifier: a row into the embedding corpus.
pub type ItemId = u64;
pub type UserId = u64;

/// Recommendation request as produced by the transport layer
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendRequest {
    /// User to recommend for
    pub user_id: i64,

    /// Ordered click history, most recent last; duplicates allowed
    #[serde(default)]
    pub history: Vec<i64>,

    /// Number of recommendations to return
    #[serde(default = "default_n_recommendations")]
    pub n_recommendations: i64,
}

fn default_n_recommendations() -> i64 {
    5
}

impl RecommendRequest {
    /// Validate wire integers into the engine's id space.
    ///
    /// Negative ids and a negative count are structured errors, never a
    /// panic; a zero count is a valid request for an empty list.
    pub fn validate(&self) -> Result<ValidatedRequest> {
        if self.user_id < 0 {
            return Err(EngineError::InvalidRequest(format!(
                "user_id must be non-negative, got {}",
                self.user_id
            )));
        }
        if self.n_recommendations < 0 {
            return Err(EngineError::InvalidRequest(format!(
                "n_recommendations must be non-negative, got {}",
                self.n_recommendations
            )));
        }

        let mut history = Vec::with_capacity(self.history.len());
        for &id in &self.history {
            if id < 0 {
                return Err(EngineError::InvalidRequest(format!(
                    "history contains negative article id {}",
                    id
                )));
            }
            history.push(id as ItemId);
        }

        Ok(ValidatedRequest {
            user_id: self.user_id as UserId,
            history,
            n: self.n_recommendations as usize,
        })
    }
}

/// Request after boundary validation
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub user_id: UserId,
    pub history: Vec<ItemId>,
    pub n: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// One ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedArticle {
    /// 1-based position in the ranking
    pub rank: usize,
    pub article_id: ItemId,
    pub score: f32,
}

/// Recommendation response consumed by the transport layer
#[derive(Debug, Clone, Serialize)]
pub struct RecommendResponse {
    pub status: ResponseStatus,
    pub user_id: i64,
    pub strategy: Strategy,
    pub weights: MethodWeights,
    pub recommendations: Vec<RankedArticle>,
    pub inference_time_ms: f64,
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
