//! Configuration types and loading.
//!
//! Provides all configuration structures for agent-evals:
//! - `EvalConfig`: top-level configuration (thresholds, domains, probes)
//! - `Thresholds`: score cutoffs used by analysis and the CI gate
//! - `DomainEntry`: built-in domain references and custom domain definitions
//!
//! Configuration is optional. An explicit `--config` path must parse; without
//! one, an `agent-evals.yaml` (or `.yml`) next to the agent definitions is
//! picked up automatically, and defaults apply when neither exists.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EvalError, Result};

/// File names probed for when no explicit config path is given.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["agent-evals.yaml", "agent-evals.yml"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub thresholds: Thresholds,
    pub domains: Option<Vec<DomainEntry>>,
    pub probes: ProbesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Overlap score above which a non-conflicting pair is flagged.
    pub max_overlap_score: f64,
    /// Overall score below which the CI gate fails.
    pub min_overall_score: f64,
    /// Live boundary score below which the CI gate fails.
    pub min_boundary_score: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_overlap_score: 0.3,
            min_overall_score: 0.7,
            min_boundary_score: 0.5,
        }
    }
}

/// One entry under `domains:`. Either the name of a built-in domain or a
/// full custom definition with its own keywords.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainEntry {
    Builtin(String),
    Custom {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extends: Option<String>,
        #[serde(default)]
        keywords: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbesConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
}

impl EvalConfig {
    /// Loads configuration from an explicit path, or discovers it alongside
    /// the agent definitions.
    pub fn load(config_path: Option<&Path>, agents_path: &Path) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_file(path);
        }

        for name in CONFIG_FILE_NAMES {
            let candidate = agents_path.join(name);
            if candidate.is_file() {
                debug!(path = %candidate.display(), "Discovered config file");
                return Self::load_file(&candidate);
            }
        }

        Ok(Self::default())
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EvalError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_yaml_bw::from_str(&content)
            .map_err(|e| EvalError::Config(format!("invalid config {}: {}", path.display(), e)))
    }
}
