use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::loader::LoadPolicy;

// ---------------------------------------------------------------------------
// Explorer configuration
// ---------------------------------------------------------------------------

/// The options the hosting layer can set, resolved once at process start.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ExplorerConfig {
    /// Delimited source the dataset loader reads.
    pub source_path: PathBuf,
    /// Model artifact the prediction service loads.
    pub model_path: PathBuf,
    /// Whether any malformed row aborts loading.
    pub strict_loading: bool,
    /// Tolerated share of malformed rows when `strict_loading` is off.
    pub max_invalid_ratio: f64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data/survey_lung_cancer.csv"),
            model_path: PathBuf::from("models/lung_model.json"),
            strict_loading: true,
            max_invalid_ratio: 0.1,
        }
    }
}

impl ExplorerConfig {
    /// Read the configuration from a JSON file. Unset keys take defaults.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&text).context("parsing config")?;
        Ok(config)
    }

    pub fn load_policy(&self) -> LoadPolicy {
        LoadPolicy {
            strict: self.strict_loading,
            max_invalid_ratio: self.max_invalid_ratio,
        }
    }
}
