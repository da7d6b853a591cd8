// ============================================
// Embedding Store
// ============================================
//
// Read-only access to the dense item-embedding matrix produced by offline
// training (PCA-reduced article vectors). The artifact is a black box; the
// store validates only shape consistency and refuses to serve on mismatch.
//
// Data Flow:
//   Artifact (.json / .bin) → shape validation → raw matrix
//                                   ↓
//                       L2-normalized matrix (once, at load)
//
// Supported file formats:
//   - JSON: { "item_id": [f32; D], ... } or [[f32; D], ...] (dense ids 0..n)
//   - Binary: bincode serialized HashMap<u64, Vec<f32>>

use ndarray::{Array2, ArrayView1};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::models::ItemId;

/// Row norms below this are treated as zero vectors.
const MIN_ROW_NORM: f32 = 1e-8;

/// Read-only item embedding matrix with O(1) id lookup.
///
/// Rows are sorted by item id at load, so dense artifacts keep id == row.
/// Immutable after load; shared read-only across concurrent requests.
pub struct EmbeddingStore {
    /// Raw embedding vectors, one row per item
    vectors: Array2<f32>,
    /// Row-wise L2-normalized copy for cosine scoring
    normalized: Array2<f32>,
    /// Row index → item id
    ids: Vec<ItemId>,
    /// Item id → row index
    index: HashMap<ItemId, usize>,
}

impl EmbeddingStore {
    /// Load the embedding artifact, dispatching on file extension.
    pub fn load(path: &str) -> Result<Self> {
        let file_path = Path::new(path);
        if !file_path.exists() {
            return Err(EngineError::CorruptModel(format!(
                "embedding artifact not found: {}",
                path
            )));
        }

        let extension = file_path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let pairs = match extension {
            "json" => Self::load_from_json(file_path)?,
            "bin" | "bincode" => Self::load_from_bincode(file_path)?,
            _ => {
                return Err(EngineError::CorruptModel(format!(
                    "unsupported embedding artifact format: {:?}",
                    extension
                )))
            }
        };

        let store = Self::from_pairs(pairs)?;

        info!(
            n_items = store.len(),
            dim = store.dim(),
            "embedding matrix loaded"
        );

        Ok(store)
    }

    /// Load from JSON format.
    /// Supports both object format { "id": [...] } and dense array format [[...]].
    fn load_from_json(path: &Path) -> Result<Vec<(ItemId, Vec<f32>)>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let parsed: serde_json::Value = serde_json::from_reader(reader)?;

        if let Some(obj) = parsed.as_object() {
            let mut pairs = Vec::with_capacity(obj.len());
            for (key, value) in obj {
                let item_id: ItemId = key.parse().map_err(|_| {
                    EngineError::CorruptModel(format!("invalid item id in embedding artifact: {}", key))
                })?;
                pairs.push((item_id, parse_row(value)?));
            }
            Ok(pairs)
        } else if let Some(rows) = parsed.as_array() {
            rows.iter()
                .enumerate()
                .map(|(row, value)| Ok((row as ItemId, parse_row(value)?)))
                .collect()
        } else {
            Err(EngineError::CorruptModel(
                "embedding artifact is neither an object nor an array".to_string(),
            ))
        }
    }

    /// Load from bincode format (binary serialized map).
    fn load_from_bincode(path: &Path) -> Result<Vec<(ItemId, Vec<f32>)>> {
        let data = std::fs::read(path)?;
        let parsed: HashMap<ItemId, Vec<f32>> = bincode::deserialize(&data)?;
        Ok(parsed.into_iter().collect())
    }

    /// Build a store from (id, vector) pairs, validating the shape contract.
    pub fn from_pairs(mut pairs: Vec<(ItemId, Vec<f32>)>) -> Result<Self> {
        if pairs.is_empty() {
            return Err(EngineError::CorruptModel(
                "embedding artifact contains no items".to_string(),
            ));
        }

        // Deterministic row order regardless of artifact format.
        pairs.sort_by_key(|(id, _)| *id);

        let dim = pairs[0].1.len();
        if dim == 0 {
            return Err(EngineError::CorruptModel(
                "embedding vectors have zero dimension".to_string(),
            ));
        }

        let mut ids = Vec::with_capacity(pairs.len());
        let mut index = HashMap::with_capacity(pairs.len());
        let mut flat = Vec::with_capacity(pairs.len() * dim);

        for (row, (id, vector)) in pairs.into_iter().enumerate() {
            if vector.len() != dim {
                return Err(EngineError::CorruptModel(format!(
                    "embedding row for item {} has dimension {}, expected {}",
                    id,
                    vector.len(),
                    dim
                )));
            }
            if index.insert(id, row).is_some() {
                return Err(EngineError::CorruptModel(format!(
                    "duplicate item id {} in embedding artifact",
                    id
                )));
            }
            ids.push(id);
            flat.extend_from_slice(&vector);
        }

        let vectors = Array2::from_shape_vec((ids.len(), dim), flat)
            .map_err(|e| EngineError::CorruptModel(format!("embedding matrix shape: {}", e)))?;

        let mut normalized = vectors.clone();
        let mut zero_rows = 0usize;
        for mut row in normalized.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > MIN_ROW_NORM {
                row.mapv_inplace(|v| v / norm);
            } else {
                row.fill(0.0);
                zero_rows += 1;
            }
        }

        if zero_rows > 0 {
            // Zero rows score 0.0 against every profile and never rank well.
            warn!(zero_rows, "embedding artifact contains zero-norm vectors");
        }

        Ok(Self {
            vectors,
            normalized,
            ids,
            index,
        })
    }

    /// Raw (unnormalized) embedding vector for an item.
    pub fn vector_of(&self, item_id: ItemId) -> Option<ArrayView1<'_, f32>> {
        self.row_of(item_id).map(|row| self.vectors.row(row))
    }

    pub fn row_of(&self, item_id: ItemId) -> Option<usize> {
        self.index.get(&item_id).copied()
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.index.contains_key(&item_id)
    }

    /// Full raw matrix, one row per item.
    pub fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }

    /// Row-wise L2-normalized matrix for cosine scoring.
    pub fn normalized(&self) -> &Array2<f32> {
        &self.normalized
    }

    /// Item ids in row order.
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.vectors.ncols()
    }
}

fn parse_row(value: &serde_json::Value) -> Result<Vec<f32>> {
    let row = value
        .as_array()
        .ok_or_else(|| EngineError::CorruptModel("embedding row is not an array".to_string()))?;

    row.iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EngineError::CorruptModel("non-numeric embedding value".to_string()))
        })
        .collect()
}
