//! Workspace abstraction over a checked-out source tree
//!
//! A workspace is the one place where the executor touches the outside
//! world: it knows which branch and commit are checked out, where the tree
//! lives on disk, and how to run a command inside it. Everything else in
//! the crate stays pure so the executor can be driven by a test double.

pub mod git;
mod process;

use crate::core::{Pipeline, PipelineConfig};
use crate::execution::CancellationToken;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use git::GitWorkspace;

/// Well-known pipeline descriptor path, relative to the workspace root
pub const DESCRIPTOR_PATH: &str = "gantry.yaml";

/// Errors from workspace construction, descriptor loading, and command
/// execution. All of them are terminal for the current call; retry policy
/// belongs to the caller.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The staging subdirectory for a clone could not be created
    #[error("staging directory unavailable at {path}: {source}")]
    StagingDirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The shallow clone did not complete
    #[error("clone of {remote} (branch {branch}) failed: {detail}")]
    CloneFailed {
        remote: String,
        branch: String,
        detail: String,
    },

    /// The directory carries no recognizable repository metadata
    #[error("{path} is not a git repository")]
    NotARepository { path: PathBuf },

    /// The pipeline descriptor file is absent
    #[error("pipeline descriptor not found at {path}")]
    DescriptorNotFound { path: PathBuf },

    /// The pipeline descriptor could not be read, parsed, or validated
    #[error("malformed pipeline descriptor at {path}: {detail}")]
    DescriptorMalformed { path: PathBuf, detail: String },

    /// The command could not be spawned or exited with a non-zero status
    #[error("command '{command}' failed: {detail}")]
    CommandFailed {
        command: String,
        detail: String,
        output: Vec<u8>,
    },

    /// The cancellation token fired while the command was in flight
    #[error("command '{command}' cancelled")]
    Cancelled { command: String, output: Vec<u8> },
}

impl WorkspaceError {
    /// Combined output captured before the failure.
    ///
    /// Empty for every kind that never ran a pipeline command. Callers
    /// append this to the transcript so diagnostics survive the error.
    pub fn output(&self) -> &[u8] {
        match self {
            WorkspaceError::CommandFailed { output, .. }
            | WorkspaceError::Cancelled { output, .. } => output,
            _ => &[],
        }
    }

    /// Whether this error was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkspaceError::Cancelled { .. })
    }
}

/// Capability set of a checked-out source tree
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Name of the checked-out ref
    fn branch(&self) -> &str;

    /// Resolved revision identifier, immutable once set
    fn commit(&self) -> &str;

    /// Root of the checked-out tree on the local filesystem
    fn directory(&self) -> &Path;

    /// Environment overrides appended to the ambient environment of every
    /// spawned command, in declaration order
    fn environment(&self) -> &[(String, String)];

    /// Read and deserialize the pipeline descriptor at [`DESCRIPTOR_PATH`]
    fn load_pipeline(&self) -> Result<Pipeline, WorkspaceError>;

    /// Run one external command rooted at the workspace directory.
    ///
    /// Standard output and standard error are captured interleaved into a
    /// single buffer. On failure the captured output travels inside the
    /// error; cancelling the token kills the child process.
    async fn execute_command(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<Vec<u8>, WorkspaceError>;
}

/// Load and validate the descriptor at [`DESCRIPTOR_PATH`] under `dir`.
///
/// Shared by [`GitWorkspace`] and by test doubles that want the real
/// loading behavior over a scratch directory.
pub fn load_descriptor(dir: &Path) -> Result<Pipeline, WorkspaceError> {
    let path = dir.join(DESCRIPTOR_PATH);

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WorkspaceError::DescriptorNotFound { path });
        }
        Err(e) => {
            return Err(WorkspaceError::DescriptorMalformed {
                path,
                detail: e.to_string(),
            });
        }
    };

    let config = PipelineConfig::from_yaml(&content).map_err(|e| {
        WorkspaceError::DescriptorMalformed {
            path,
            detail: e.to_string(),
        }
    })?;

    Ok(config.to_pipeline())
}
