//! Activity-tier strategy selection.
//!
//! A pure function of history length: users with little history lean
//! entirely on content similarity, active users lean on collaborative
//! signals.

use serde::{Deserialize, Serialize};

/// Histories up to this length classify as cold start.
pub const COLD_START_MAX_HISTORY: usize = 5;
/// Histories up to this length (and above the cold-start bound) classify as moderate.
pub const MODERATE_MAX_HISTORY: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ColdStart,
    Moderate,
    Active,
}

impl Strategy {
    /// Classify a user by click-history length.
    pub fn classify(history_len: usize) -> Self {
        if history_len <= COLD_START_MAX_HISTORY {
            Strategy::ColdStart
        } else if history_len <= MODERATE_MAX_HISTORY {
            Strategy::Moderate
        } else {
            Strategy::Active
        }
    }

    /// Blend weights for this tier. Always sum to 1.0.
    pub fn weights(self) -> MethodWeights {
        match self {
            Strategy::ColdStart => MethodWeights {
                content: 1.0,
                collaborative: 0.0,
            },
            Strategy::Moderate => MethodWeights {
                content: 0.7,
                collaborative: 0.3,
            },
            Strategy::Active => MethodWeights {
                content: 0.3,
                collaborative: 0.7,
            },
        }
    }
}

/// Per-method blend weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MethodWeights {
    pub content: f32,
    pub collaborative: f32,
}

impl MethodWeights {
    /// Move the full weight of an unavailable method onto the available one.
    ///
    /// This is an explicit decision, not a side effect of multiplying a
    /// zero-filled score vector: a user whose collaborative profile is
    /// missing still gets full-strength content scores.
    pub fn redistribute(self, content_available: bool, collaborative_available: bool) -> Self {
        match (content_available, collaborative_available) {
            (true, false) => Self {
                content: 1.0,
                collaborative: 0.0,
            },
            (false, true) => Self {
                content: 0.0,
                collaborative: 1.0,
            },
            // Both available keeps the tier blend; neither available keeps
            // the tier blend for reporting while the caller falls back.
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(Strategy::classify(0), Strategy::ColdStart);
        assert_eq!(Strategy::classify(5), Strategy::ColdStart);
        assert_eq!(Strategy::classify(6), Strategy::Moderate);
        assert_eq!(Strategy::classify(15), Strategy::Moderate);
        assert_eq!(Strategy::classify(16), Strategy::Active);
        assert_eq!(Strategy::classify(1000), Strategy::Active);
    }

    #[test]
    fn test_weights_per_tier() {
        assert_eq!(
            Strategy::ColdStart.weights(),
            MethodWeights {
                content: 1.0,
                collaborative: 0.0
            }
        );
        assert_eq!(
            Strategy::Moderate.weights(),
            MethodWeights {
                content: 0.7,
                collaborative: 0.3
            }
        );
        assert_eq!(
            Strategy::Active.weights(),
            MethodWeights {
                content: 0.3,
                collaborative: 0.7
            }
        );
    }

    #[test]
    fn test_weights_sum_to_one() {
        for strategy in [Strategy::ColdStart, Strategy::Moderate, Strategy::Active] {
            let weights = strategy.weights();
            assert!((weights.content + weights.collaborative - 1.0).abs() < f32::EPSILON);
            assert!(weights.content >= 0.0);
            assert!(weights.collaborative >= 0.0);
        }
    }

    #[test]
    fn test_redistribution() {
        let weights = Strategy::Active.weights();

        let content_only = weights.redistribute(true, false);
        assert_eq!(content_only.content, 1.0);
        assert_eq!(content_only.collaborative, 0.0);

        let collaborative_only = weights.redistribute(false, true);
        assert_eq!(collaborative_only.content, 0.0);
        assert_eq!(collaborative_only.collaborative, 1.0);

        let both = weights.redistribute(true, true);
        assert_eq!(both, weights);
    }

    #[test]
    fn test_strategy_serde_names() {
        assert_eq!(
            serde_json::to_string(&Strategy::ColdStart).unwrap(),
            "\"cold_start\""
        );
        assert_eq!(
            serde_json::to_string(&Strategy::Moderate).unwrap(),
            "\"moderate\""
        );
        assert_eq!(
            serde_json::to_string(&Strategy::Active).unwrap(),
            "\"active\""
        );
    }
}
