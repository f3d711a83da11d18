//! Pipeline configuration from YAML

use crate::core::Pipeline;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Pipeline steps
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Human-readable step name
    pub name: String,

    /// Shell command lines to run, in order
    #[serde(default)]
    pub commands: Vec<String>,
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    ///
    /// A pipeline with zero steps and a step with zero commands are both
    /// valid. A command that tokenizes to nothing is a configuration error
    /// and is rejected here, before anything runs.
    pub fn validate(&self) -> Result<()> {
        for step in &self.steps {
            for command in &step.commands {
                if command.split_whitespace().next().is_none() {
                    anyhow::bail!(
                        "Step '{}' contains an empty command",
                        step.name
                    );
                }
            }
        }

        Ok(())
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Pipeline {
        Pipeline::from_config(self)
    }
}
