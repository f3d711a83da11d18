//! CLI command definitions

use clap::Args;

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Workspace directory holding an existing checkout
    #[arg(default_value = ".", conflicts_with = "remote")]
    pub path: String,

    /// Remote repository to clone instead of opening a local checkout
    #[arg(long)]
    pub remote: Option<String>,

    /// Branch to check out when cloning
    #[arg(long, default_value = "main", requires = "remote")]
    pub branch: String,

    /// Staging root that receives remote clones
    #[arg(long, default_value = "/tmp/gantry", requires = "remote")]
    pub staging: String,

    /// Explicit pipeline YAML file (defaults to the workspace descriptor)
    #[arg(short, long)]
    pub file: Option<String>,

    /// Environment overrides (key=value), applied in order
    #[arg(long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,
}

/// Validate a pipeline descriptor
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
