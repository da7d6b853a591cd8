// ============================================
// Collaborative Filtering Model
// ============================================
//
// Latent-factor model produced by offline SVD factorization: per-user and
// per-item factor rows plus global/user/item bias scalars. Predicted
// affinity for (user, item) is reconstructed as
//
//   score = global_bias + b_user + b_item + q_item · p_user
//
// vectorized over every item in one matrix-vector product.
//
// The item rows are aligned with the embedding corpus; the engine validates
// the id spaces match at construction.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

use crate::error::{EngineError, Result};
use crate::models::{ItemId, UserId};

/// On-disk shape of the factors artifact (`.json` or `.bin`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorsArtifact {
    #[serde(default)]
    pub global_bias: f32,
    pub user_factors: HashMap<UserId, Vec<f32>>,
    #[serde(default)]
    pub user_biases: HashMap<UserId, f32>,
    pub item_ids: Vec<ItemId>,
    pub item_factors: Vec<Vec<f32>>,
    #[serde(default)]
    pub item_biases: Vec<f32>,
}

/// Read-only collaborative model, shared across concurrent requests.
pub struct CollaborativeModel {
    global_bias: f32,
    user_index: HashMap<UserId, usize>,
    user_factors: Array2<f32>,
    user_biases: Vec<f32>,
    item_ids: Vec<ItemId>,
    item_factors: Array2<f32>,
    item_biases: Array1<f32>,
}

impl CollaborativeModel {
    /// Load the factors artifact, dispatching on file extension.
    pub fn load(path: &str) -> Result<Self> {
        let file_path = Path::new(path);
        if !file_path.exists() {
            return Err(EngineError::CorruptModel(format!(
                "factors artifact not found: {}",
                path
            )));
        }

        let extension = file_path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let artifact: FactorsArtifact = match extension {
            "json" => {
                let file = File::open(file_path)?;
                serde_json::from_reader(BufReader::new(file))?
            }
            "bin" | "bincode" => bincode::deserialize(&std::fs::read(file_path)?)?,
            _ => {
                return Err(EngineError::CorruptModel(format!(
                    "unsupported factors artifact format: {:?}",
                    extension
                )))
            }
        };

        let model = Self::from_artifact(artifact)?;

        info!(
            n_users = model.n_users(),
            n_items = model.n_items(),
            factor_dim = model.factor_dim(),
            "collaborative factors loaded"
        );

        Ok(model)
    }

    /// Validate and assemble the artifact into dense matrices.
    pub fn from_artifact(artifact: FactorsArtifact) -> Result<Self> {
        if artifact.item_ids.len() != artifact.item_factors.len() {
            return Err(EngineError::CorruptModel(format!(
                "factors artifact has {} item ids but {} item factor rows",
                artifact.item_ids.len(),
                artifact.item_factors.len()
            )));
        }
        if artifact.item_factors.is_empty() {
            return Err(EngineError::CorruptModel(
                "factors artifact contains no items".to_string(),
            ));
        }

        let factor_dim = artifact.item_factors[0].len();
        if factor_dim == 0 {
            return Err(EngineError::CorruptModel(
                "factor vectors have zero dimension".to_string(),
            ));
        }

        let item_biases = if artifact.item_biases.is_empty() {
            Array1::zeros(artifact.item_ids.len())
        } else if artifact.item_biases.len() == artifact.item_ids.len() {
            Array1::from(artifact.item_biases)
        } else {
            return Err(EngineError::CorruptModel(format!(
                "factors artifact has {} item biases for {} items",
                artifact.item_biases.len(),
                artifact.item_ids.len()
            )));
        };

        let mut item_flat = Vec::with_capacity(artifact.item_ids.len() * factor_dim);
        for (id, row) in artifact.item_ids.iter().zip(&artifact.item_factors) {
            if row.len() != factor_dim {
                return Err(EngineError::CorruptModel(format!(
                    "item factor row for {} has dimension {}, expected {}",
                    id,
                    row.len(),
                    factor_dim
                )));
            }
            item_flat.extend_from_slice(row);
        }
        let item_factors =
            Array2::from_shape_vec((artifact.item_ids.len(), factor_dim), item_flat)
                .map_err(|e| EngineError::CorruptModel(format!("item factor shape: {}", e)))?;

        // Deterministic user row order for reproducible construction.
        let mut users: Vec<(UserId, Vec<f32>)> = artifact.user_factors.into_iter().collect();
        users.sort_by_key(|(id, _)| *id);

        let mut user_index = HashMap::with_capacity(users.len());
        let mut user_biases = Vec::with_capacity(users.len());
        let mut user_flat = Vec::with_capacity(users.len() * factor_dim);
        for (row, (id, factors)) in users.into_iter().enumerate() {
            if factors.len() != factor_dim {
                return Err(EngineError::CorruptModel(format!(
                    "user factor row for {} has dimension {}, expected {}",
                    id,
                    factors.len(),
                    factor_dim
                )));
            }
            user_index.insert(id, row);
            user_biases.push(artifact.user_biases.get(&id).copied().unwrap_or(0.0));
            user_flat.extend_from_slice(&factors);
        }
        let user_factors = Array2::from_shape_vec((user_index.len(), factor_dim), user_flat)
            .map_err(|e| EngineError::CorruptModel(format!("user factor shape: {}", e)))?;

        Ok(Self {
            global_bias: artifact.global_bias,
            user_index,
            user_factors,
            user_biases,
            item_ids: artifact.item_ids,
            item_factors,
            item_biases,
        })
    }

    /// Factor row and bias for a user; `None` means the factor model has
    /// never seen this user (cold start for this method).
    pub fn user_row(&self, user_id: UserId) -> Option<(ArrayView1<'_, f32>, f32)> {
        self.user_index
            .get(&user_id)
            .map(|&row| (self.user_factors.row(row), self.user_biases[row]))
    }

    /// Predicted affinity of this user against every item, in item row order.
    pub fn score_all(&self, user_row: ArrayView1<'_, f32>, user_bias: f32) -> Array1<f32> {
        self.item_factors.dot(&user_row) + &self.item_biases + (self.global_bias + user_bias)
    }

    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    pub fn factor_dim(&self) -> usize {
        self.item_factors.ncols()
    }

    pub fn n_users(&self) -> usize {
        self.user_index.len()
    }

    pub fn n_items(&self) -> usize {
        self.item_ids.len()
    }
}
