use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the item embedding artifact (`.json` or `.bin`).
    pub embeddings_path: String,
    /// Optional path to the collaborative factors artifact.
    #[serde(default)]
    pub factors_path: Option<String>,
    /// Optional path to the popularity table used as the cold fallback.
    #[serde(default)]
    pub popularity_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// TTL in seconds; 0 disables result caching.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(EngineConfig {
            model: ModelConfig {
                embeddings_path: std::env::var("EMBEDDINGS_PATH")
                    .unwrap_or_else(|_| "./models/embeddings.bin".to_string()),
                factors_path: std::env::var("FACTORS_PATH").ok(),
                popularity_path: std::env::var("POPULARITY_PATH").ok(),
            },
            cache: CacheSettings {
                capacity: std::env::var("RESULT_CACHE_CAPACITY")
                    .unwrap_or_else(|_| default_cache_capacity().to_string())
                    .parse()?,
                ttl_secs: std::env::var("RESULT_CACHE_TTL_SECS")
                    .unwrap_or_else(|_| default_cache_ttl_secs().to_string())
                    .parse()?,
            },
        })
    }
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_cache_ttl_secs() -> u64 {
    300
}
