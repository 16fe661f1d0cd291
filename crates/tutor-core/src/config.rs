//! Tutor configuration file.
//!
//! [`TutorConfig`] is stored as TOML (by default `./tutor.toml`) and supports
//! partial files: every section and field falls back to its default.
//!
//! ```toml
//! [paths]
//! action_space_dir = "action_spaces"
//! grid_file = "test_data/grids/rte_case14_realistic.json"
//!
//! [resolver]
//! metric = "l2"
//!
//! [training]
//! model_type = "FCNN"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TutorError, TutorResult};

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    pub paths: PathsConfig,
    pub generation: GenerationConfig,
    pub resolver: ResolverConfig,
    pub training: TrainingConfig,
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding one persisted action space per disabled line.
    pub action_space_dir: PathBuf,

    /// Grid connectivity table (JSON).
    pub grid_file: Option<PathBuf>,

    /// Exclusion rule table (TOML or JSON).
    pub rules_file: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            action_space_dir: PathBuf::from("action_spaces"),
            grid_file: None,
            rules_file: None,
        }
    }
}

/// Action-space generation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Enumerate substations on the rayon pool.
    pub parallel: bool,

    /// Built-in exclusion rule preset (e.g. `rte_case14_realistic`).
    pub preset: Option<String>,

    /// Restrict generation to these substations.
    pub substations: Option<Vec<usize>>,

    /// Disabled lines to prepare action spaces for, besides the intact grid.
    pub disabled_lines: Vec<usize>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            preset: None,
            substations: None,
            disabled_lines: Vec::new(),
        }
    }
}

/// Nearest-action resolver options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub metric: DistanceMetric,
    pub encoding: EncodingKind,

    /// Activation below which a prediction counts as "no change".
    pub substation_threshold: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::default(),
            encoding: EncodingKind::default(),
            substation_threshold: 0.5,
        }
    }
}

/// Settings consumed by the external model-training collaborator.
///
/// Type names are kept as strings so a file written for a newer trainer
/// still loads; [`TrainingConfig::model_type`] and
/// [`TrainingConfig::network_type`] do the checking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub model_type: String,
    pub network_type: String,
    pub early_stopping_patience: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::Gcn.to_string(),
            network_type: NetworkType::Heterogenous.to_string(),
            early_stopping_patience: 50,
        }
    }
}

impl TrainingConfig {
    pub fn model_type(&self) -> TutorResult<ModelType> {
        self.model_type.parse()
    }

    pub fn network_type(&self) -> TutorResult<NetworkType> {
        self.network_type.parse()
    }
}

/// Distance between an encoded action and a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Sum of absolute differences.
    #[default]
    L1,
    /// Sum of squared differences.
    L2,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::L1 => "l1",
            DistanceMetric::L2 => "l2",
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l1" | "manhattan" => Ok(DistanceMetric::L1),
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            other => Err(TutorError::invalid(format!(
                "unknown distance metric '{}'; expected l1 or l2",
                other
            ))),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How actions are turned into values comparable with a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EncodingKind {
    /// Raw busbar numbers (0 outside the substation, 1 or 2 inside).
    #[default]
    Assignment,
    /// 1 where an object goes to busbar 2, 0 elsewhere.
    SecondBusbar,
    /// 1 where an object changes busbar relative to the current topology.
    TopologyChange,
}

impl EncodingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingKind::Assignment => "assignment",
            EncodingKind::SecondBusbar => "second-busbar",
            EncodingKind::TopologyChange => "topology-change",
        }
    }
}

impl FromStr for EncodingKind {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "assignment" => Ok(EncodingKind::Assignment),
            "second-busbar" => Ok(EncodingKind::SecondBusbar),
            "topology-change" | "change" => Ok(EncodingKind::TopologyChange),
            other => Err(TutorError::invalid(format!(
                "unknown action encoding '{}'; expected assignment, second-busbar or topology-change",
                other
            ))),
        }
    }
}

impl fmt::Display for EncodingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    Gcn,
    Fcnn,
}

impl FromStr for ModelType {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GCN" => Ok(ModelType::Gcn),
            "FCNN" => Ok(ModelType::Fcnn),
            other => Err(TutorError::invalid(format!(
                "unknown model type '{}'; expected GCN or FCNN",
                other
            ))),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelType::Gcn => "GCN",
            ModelType::Fcnn => "FCNN",
        })
    }
}

/// Graph flavour for the GCN model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    /// One node type for every object.
    Homogenous,
    /// Separate node types for loads, generators and line endpoints.
    Heterogenous,
}

impl FromStr for NetworkType {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "homogenous" => Ok(NetworkType::Homogenous),
            "heterogenous" => Ok(NetworkType::Heterogenous),
            other => Err(TutorError::invalid(format!(
                "unknown network type '{}'; expected homogenous or heterogenous",
                other
            ))),
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NetworkType::Homogenous => "homogenous",
            NetworkType::Heterogenous => "heterogenous",
        })
    }
}

impl TutorConfig {
    /// Default config file path, relative to the working directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from("tutor.toml")
    }

    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> TutorResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, or the default location, or fall back to defaults when
    /// neither exists.
    pub fn load_or_default(path: Option<&Path>) -> TutorResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::load(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> TutorResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> TutorResult<()> {
        self.training.model_type()?;
        self.training.network_type()?;
        let threshold = self.resolver.substation_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(TutorError::invalid(format!(
                "resolver.substation_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = TutorConfig::default();
        assert!(config.generation.parallel);
        assert_eq!(config.resolver.metric, DistanceMetric::L1);
        assert_eq!(config.resolver.substation_threshold, 0.5);
        assert_eq!(config.training.model_type().unwrap(), ModelType::Gcn);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_parsing() {
        let toml = r#"
            [resolver]
            metric = "l2"
            encoding = "second-busbar"

            [training]
            model_type = "FCNN"
        "#;

        let config: TutorConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.resolver.metric, DistanceMetric::L2);
        assert_eq!(config.resolver.encoding, EncodingKind::SecondBusbar);
        assert_eq!(config.training.model_type().unwrap(), ModelType::Fcnn);

        // Defaults for unset values
        assert_eq!(config.paths.action_space_dir, PathBuf::from("action_spaces"));
        assert_eq!(
            config.training.network_type().unwrap(),
            NetworkType::Heterogenous
        );
    }

    #[test]
    fn test_unknown_model_type_rejected() {
        let mut config = TutorConfig::default();
        config.training.model_type = "RNN".into();
        assert!(matches!(
            config.validate(),
            Err(TutorError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_unknown_network_type_rejected() {
        assert!("bipartite".parse::<NetworkType>().is_err());
        assert_eq!(
            "homogenous".parse::<NetworkType>().unwrap(),
            NetworkType::Homogenous
        );
    }

    #[test]
    fn test_metric_and_encoding_parsing() {
        assert_eq!("L2".parse::<DistanceMetric>().unwrap(), DistanceMetric::L2);
        assert!("cosine".parse::<DistanceMetric>().is_err());
        assert_eq!(
            "second_busbar".parse::<EncodingKind>().unwrap(),
            EncodingKind::SecondBusbar
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tutor.toml");

        let mut config = TutorConfig::default();
        config.generation.disabled_lines = vec![0, 3];
        config.resolver.substation_threshold = 0.25;
        config.save(&path).unwrap();

        let loaded = TutorConfig::load(&path).unwrap();
        assert_eq!(loaded.generation.disabled_lines, vec![0, 3]);
        assert_eq!(loaded.resolver.substation_threshold, 0.25);
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut config = TutorConfig::default();
        config.resolver.substation_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
