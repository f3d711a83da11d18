//! Core domain models for gantry
//!
//! This module defines the fundamental data structures that represent
//! pipelines, steps, and their configuration.

pub mod config;
pub mod pipeline;
pub mod step;

pub use config::{PipelineConfig, StepConfig};
pub use pipeline::*;
pub use step::*;
