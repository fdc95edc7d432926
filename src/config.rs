//! Runtime configuration for the retrieval core.
//!
//! Defaults mirror the values the assistant ships with; `from_env` overlays
//! environment variables (after loading `.env` via `dotenvy`) so deployments
//! can tune retrieval without code changes.

use std::time::Duration;

/// Tunables for ingestion and retrieval.
#[derive(Clone, Debug)]
pub struct RagConfig {
    /// Default number of results returned by a search.
    pub top_k_results: usize,
    /// Maximum characters per page-content chunk.
    pub chunk_size: usize,
    /// Documents per upsert batch, bounding single-request payload size.
    pub batch_size: usize,
    /// Character budget for assembled LLM context.
    pub max_context_length: usize,
    /// Over-fetch multiplier for example search (fetch `factor * top_k`
    /// candidates, then post-filter).
    pub example_overfetch_factor: usize,
    /// Time-to-live for cached external file listings.
    pub cache_ttl: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k_results: 3,
            chunk_size: 2000,
            batch_size: 20,
            max_context_length: 3000,
            example_overfetch_factor: 2,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

impl RagConfig {
    /// Loads configuration from the environment, falling back to defaults.
    ///
    /// Reads `.env` first so local development picks up the same variables a
    /// deployment would set. Unparseable values fall back to the default for
    /// that field.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();
        Self {
            top_k_results: env_usize("DESIGNSMITH_TOP_K", defaults.top_k_results),
            chunk_size: env_usize("DESIGNSMITH_CHUNK_SIZE", defaults.chunk_size),
            batch_size: env_usize("DESIGNSMITH_BATCH_SIZE", defaults.batch_size),
            max_context_length: env_usize(
                "DESIGNSMITH_MAX_CONTEXT_LENGTH",
                defaults.max_context_length,
            ),
            example_overfetch_factor: env_usize(
                "DESIGNSMITH_EXAMPLE_OVERFETCH",
                defaults.example_overfetch_factor,
            ),
            cache_ttl: Duration::from_secs(env_u64(
                "DESIGNSMITH_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
