//! Pipeline parameters.
//!
//! Loaded once from a DVC-style `params.yaml` and passed by reference into
//! every stage. The `download` section is shared with the (external) download
//! stage, so keys this crate does not use are ignored.
//!
//! ```yaml
//! download:
//!   destination: data/raw/
//!   monthly_features: [MonthlyMeanTemperature]
//!   hourly_features: [HourlyDryBulbTemperature]
//! evaluate:
//!   output_dir: data/output/
//!   computed_dir: data/computed/
//!   threshold: 0.9
//!   pairing: station
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// Global R² above which the pipeline is classified as consistent.
pub const DEFAULT_THRESHOLD: f64 = 0.90;

/// A reported monthly column and the raw hourly column it summarises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturePair {
    pub monthly_name: String,
    pub hourly_name: String,
}

impl FeaturePair {
    pub fn new(monthly_name: impl Into<String>, hourly_name: impl Into<String>) -> Self {
        Self {
            monthly_name: monthly_name.into(),
            hourly_name: hourly_name.into(),
        }
    }
}

/// How ground-truth files and columns are matched with computed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingPolicy {
    /// Join files by station id and columns by feature pair.
    #[default]
    Station,
    /// Zip sorted directory listings and column lists by position.
    Positional,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub pairs: Vec<FeaturePair>,
    /// Directory holding the raw per-station hourly files.
    pub raw_dir: PathBuf,
    /// Directory for the extracted (reported) monthly tables.
    pub output_dir: PathBuf,
    /// Directory for the `computed_` monthly tables.
    pub computed_dir: PathBuf,
    /// Directory for the metrics summary and evaluation history.
    pub eval_dir: PathBuf,
    pub threshold: f64,
    pub pairing: PairingPolicy,
}

#[derive(Debug, Deserialize)]
struct ParamsFile {
    download: DownloadParams,
    #[serde(default)]
    evaluate: EvaluateParams,
}

#[derive(Debug, Deserialize)]
struct DownloadParams {
    destination: PathBuf,
    monthly_features: Vec<String>,
    hourly_features: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EvaluateParams {
    output_dir: Option<PathBuf>,
    computed_dir: Option<PathBuf>,
    eval_dir: Option<PathBuf>,
    threshold: Option<f64>,
    pairing: Option<PairingPolicy>,
}

impl PipelineConfig {
    /// Reads and validates the parameter file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let params: ParamsFile = serde_yaml::from_str(content)?;
        let DownloadParams {
            destination,
            monthly_features,
            hourly_features,
        } = params.download;

        if monthly_features.len() != hourly_features.len() {
            return Err(PipelineError::Config {
                field: "download.hourly_features".into(),
                reason: format!(
                    "{} monthly features but {} hourly features",
                    monthly_features.len(),
                    hourly_features.len()
                ),
            });
        }

        let pairs = monthly_features
            .into_iter()
            .zip(hourly_features)
            .map(|(monthly, hourly)| FeaturePair::new(monthly, hourly))
            .collect();

        let evaluate = params.evaluate;
        let config = Self {
            pairs,
            raw_dir: destination,
            output_dir: evaluate
                .output_dir
                .unwrap_or_else(|| PathBuf::from("data/output")),
            computed_dir: evaluate
                .computed_dir
                .unwrap_or_else(|| PathBuf::from("data/computed")),
            eval_dir: evaluate.eval_dir.unwrap_or_else(|| PathBuf::from("eval")),
            threshold: evaluate.threshold.unwrap_or(DEFAULT_THRESHOLD),
            pairing: evaluate.pairing.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants every stage relies on.
    pub fn validate(&self) -> Result<()> {
        if self.pairs.is_empty() {
            return Err(PipelineError::Config {
                field: "download.monthly_features".into(),
                reason: "at least one feature pair is required".into(),
            });
        }
        for pair in &self.pairs {
            if pair.monthly_name.trim().is_empty() || pair.hourly_name.trim().is_empty() {
                return Err(PipelineError::Config {
                    field: "download.monthly_features".into(),
                    reason: "feature names must not be blank".into(),
                });
            }
        }
        if !self.threshold.is_finite() {
            return Err(PipelineError::Config {
                field: "evaluate.threshold".into(),
                reason: format!("{} is not a finite number", self.threshold),
            });
        }
        Ok(())
    }
}
