use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{ensure, Context, Result};

use crate::corpus::builder::BuildOptions;
use crate::matching::cluster_model::ClusterParams;

/// Hard ceiling on results per query, mirroring the selection UI's slider.
pub const MAX_TOP_K: usize = 20;

/// Application configuration loaded from environment variables.
/// Fails at startup if a numeric variable is malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub artifact_dir: PathBuf,
    /// Raw postings to build from when no artifact set has been committed yet.
    pub seed_corpus_path: Option<PathBuf>,
    pub num_clusters: usize,
    pub cluster_seed: u64,
    pub cluster_restarts: usize,
    pub cluster_max_iterations: usize,
    pub cluster_tolerance: f64,
    pub default_top_k: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            artifact_dir: std::env::var("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./artifacts")),
            seed_corpus_path: std::env::var("SEED_CORPUS_PATH").ok().map(PathBuf::from),
            num_clusters: parse_env("NUM_CLUSTERS", 5)?,
            cluster_seed: parse_env("CLUSTER_SEED", 42)?,
            cluster_restarts: parse_env("CLUSTER_RESTARTS", 10)?,
            cluster_max_iterations: parse_env("CLUSTER_MAX_ITERATIONS", 300)?,
            cluster_tolerance: parse_env("CLUSTER_TOLERANCE", 1e-4)?,
            default_top_k: parse_env("DEFAULT_TOP_K", 5)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.num_clusters >= 1, "NUM_CLUSTERS must be at least 1");
        ensure!(self.cluster_restarts >= 1, "CLUSTER_RESTARTS must be at least 1");
        ensure!(
            self.cluster_max_iterations >= 1,
            "CLUSTER_MAX_ITERATIONS must be at least 1"
        );
        ensure!(
            self.cluster_tolerance >= 0.0,
            "CLUSTER_TOLERANCE must not be negative"
        );
        ensure!(
            (1..=MAX_TOP_K).contains(&self.default_top_k),
            "DEFAULT_TOP_K must be between 1 and {MAX_TOP_K}"
        );
        Ok(())
    }

    /// Build options for a rebuild, optionally overriding the configured cluster count.
    pub fn build_options(&self, num_clusters: Option<usize>) -> BuildOptions {
        BuildOptions {
            num_clusters: num_clusters.unwrap_or(self.num_clusters),
            cluster: ClusterParams {
                seed: self.cluster_seed,
                restarts: self.cluster_restarts,
                max_iterations: self.cluster_max_iterations,
                tolerance: self.cluster_tolerance,
            },
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
