//! Pipeline domain model

use crate::core::{config::PipelineConfig, step::Step};

/// A pipeline definition
///
/// Immutable once built; steps execute in `Vec` order, one command at a
/// time. A pipeline with no steps is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Pipeline steps, in execution order
    pub steps: Vec<Step>,
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        Pipeline {
            name: config.name.clone(),
            steps: config.steps.iter().map(Step::from_config).collect(),
        }
    }

    /// Total number of commands across all steps
    pub fn command_count(&self) -> usize {
        self.steps.iter().map(|s| s.commands.len()).sum()
    }
}
