//! Already-parsed pipeline parameters.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactName, OracleKind};
use crate::error::Error;

/// The pattern a pipeline assembles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Two triangles sharing an edge; four vertices.
    ChordalSquare,
    /// A four-cycle whose vertices all touch one hub; five vertices.
    SolarSquare,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningConfig {
    pub enabled: bool,
    pub false_positive_rate: f64,
}

impl Default for PruningConfig {
    fn default() -> Self { PruningConfig { enabled: false, false_positive_rate: 0.001 } }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub pattern: Pattern,
    /// Root for directory-backed artifacts.
    pub work_dir: PathBuf,
    /// Reduce partitions, and the number of splits each map input is cut into.
    pub reducers: usize,
    /// Report a count instead of materializing instances.
    pub count_only: bool,
    pub pruning: PruningConfig,
    /// Largest chunk of lower-ranked neighbors in one adjacency record.
    pub max_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            pattern: Pattern::ChordalSquare,
            work_dir: PathBuf::from("."),
            reducers: 4,
            count_only: false,
            pruning: PruningConfig::default(),
            max_size: 1024,
        }
    }
}

impl PipelineConfig {
    pub fn new(pattern: Pattern) -> Self { PipelineConfig { pattern, ..Self::default() } }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let config: PipelineConfig =
            serde_json::from_str(text).map_err(|e| Error::Config(format!("unreadable config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects inconsistent settings before any work is scheduled.
    pub fn validate(&self) -> Result<(), Error> {
        if self.reducers == 0 {
            return Err(Error::Config("reducers must be positive".to_string()));
        }
        if self.max_size == 0 {
            return Err(Error::Config("max_size must be positive".to_string()));
        }
        let rate = self.pruning.false_positive_rate;
        if self.pruning.enabled && !(rate > 0.0 && rate < 1.0) {
            return Err(Error::Config(format!("false positive rate {} outside (0, 1)", rate)));
        }
        Ok(())
    }

    /// Name of the oracle of `kind` at the configured rate.
    pub fn oracle_name(&self, kind: OracleKind) -> ArtifactName {
        ArtifactName { kind, false_positive_rate: self.pruning.false_positive_rate }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inconsistent_settings() {
        let mut config = PipelineConfig::new(Pattern::SolarSquare);
        config.reducers = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = PipelineConfig::default();
        config.pruning = PruningConfig { enabled: true, false_positive_rate: 1.5 };
        assert!(config.validate().is_err());

        // an out-of-range rate is harmless while pruning is off.
        config.pruning.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_json_with_defaults() {
        let config = PipelineConfig::from_json(
            r#"{ "pattern": "solar_square", "count_only": true, "pruning": { "enabled": true } }"#,
        )
        .unwrap();
        assert_eq!(config.pattern, Pattern::SolarSquare);
        assert!(config.count_only);
        assert!(config.pruning.enabled);
        assert_eq!(config.pruning.false_positive_rate, 0.001);
        assert_eq!(config.reducers, 4);

        assert!(PipelineConfig::from_json(r#"{ "max_size": 0 }"#).is_err());
        assert!(PipelineConfig::from_json("not json").is_err());
    }
}
