//! Popularity table: the default served when no method has a usable
//! profile (new users, histories of only stale/foreign ids).

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

use crate::error::{EngineError, Result};
use crate::models::{ItemId, RankedArticle};

/// Items ranked by global click count, descending, ties on lower id.
pub struct PopularityTable {
    ranked: Vec<(ItemId, u64)>,
}

impl PopularityTable {
    pub fn load(path: &str) -> Result<Self> {
        let file_path = Path::new(path);
        if !file_path.exists() {
            return Err(EngineError::CorruptModel(format!(
                "popularity artifact not found: {}",
                path
            )));
        }

        let extension = file_path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let counts: HashMap<ItemId, u64> = match extension {
            "json" => {
                let file = File::open(file_path)?;
                serde_json::from_reader(BufReader::new(file))?
            }
            "bin" | "bincode" => bincode::deserialize(&std::fs::read(file_path)?)?,
            _ => {
                return Err(EngineError::CorruptModel(format!(
                    "unsupported popularity artifact format: {:?}",
                    extension
                )))
            }
        };

        let table = Self::from_counts(counts);
        info!(entries = table.len(), "popularity table loaded");
        Ok(table)
    }

    pub fn from_counts(counts: HashMap<ItemId, u64>) -> Self {
        let mut ranked: Vec<(ItemId, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Self { ranked }
    }

    /// Top `n` popular items the user has not seen, with a rank-decayed
    /// score in place of a similarity.
    pub fn top_n(&self, n: usize, exclude: &HashSet<ItemId>) -> Vec<RankedArticle> {
        self.ranked
            .iter()
            .filter(|(id, _)| !exclude.contains(id))
            .take(n)
            .enumerate()
            .map(|(i, &(article_id, _))| RankedArticle {
                rank: i + 1,
                article_id,
                score: 1.0 - 0.05 * (i + 1) as f32,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}
