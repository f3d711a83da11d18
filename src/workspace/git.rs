//! Git-backed workspace
//!
//! The one concrete [`Workspace`] implementation: a source tree checked
//! out with the git CLI, either cloned shallowly into a staging directory
//! or opened in place.

use crate::core::Pipeline;
use crate::execution::CancellationToken;
use crate::workspace::{load_descriptor, process, Workspace, WorkspaceError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;
use uuid::Uuid;

/// A workspace rooted at a git checkout on the local filesystem
#[derive(Debug, Clone)]
pub struct GitWorkspace {
    branch: String,
    commit: String,
    directory: PathBuf,
    environment: Vec<(String, String)>,
}

impl GitWorkspace {
    /// Clone `branch` of `remote` into a fresh subdirectory of
    /// `staging_root`.
    ///
    /// The clone is shallow (depth 1) and single-branch; the resulting head
    /// revision becomes the workspace commit. The staging subdirectory is
    /// never deleted by this crate — cleanup belongs to the caller.
    pub async fn clone_remote(
        staging_root: &Path,
        remote: &str,
        branch: &str,
    ) -> Result<Self, WorkspaceError> {
        let directory = staging_root.join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&directory).map_err(|e| {
            WorkspaceError::StagingDirUnavailable {
                path: directory.clone(),
                source: e,
            }
        })?;

        info!(
            "Cloning {} (branch {}) into {}",
            remote,
            branch,
            directory.display()
        );

        let output = Command::new("git")
            .args(["clone", "--depth", "1", "--single-branch", "--branch", branch, remote])
            .arg(&directory)
            .output()
            .await
            .map_err(|e| WorkspaceError::CloneFailed {
                remote: remote.to_string(),
                branch: branch.to_string(),
                detail: format!("failed to run git: {}", e),
            })?;

        if !output.status.success() {
            return Err(WorkspaceError::CloneFailed {
                remote: remote.to_string(),
                branch: branch.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let commit = git_line(&directory, &["rev-parse", "HEAD"]).await.ok_or_else(|| {
            WorkspaceError::CloneFailed {
                remote: remote.to_string(),
                branch: branch.to_string(),
                detail: "clone completed but HEAD could not be resolved".to_string(),
            }
        })?;

        Ok(Self {
            branch: branch.to_string(),
            commit,
            directory,
            environment: Vec::new(),
        })
    }

    /// Open an existing checkout in place.
    ///
    /// Resolves the current head revision and the short name of the
    /// checked-out branch. A directory without repository metadata, or
    /// without a resolvable head, is rejected.
    pub async fn open_local(directory: impl Into<PathBuf>) -> Result<Self, WorkspaceError> {
        let directory = directory.into();

        if git_line(&directory, &["rev-parse", "--git-dir"]).await.is_none() {
            return Err(WorkspaceError::NotARepository { path: directory });
        }

        let commit = match git_line(&directory, &["rev-parse", "HEAD"]).await {
            Some(commit) => commit,
            None => return Err(WorkspaceError::NotARepository { path: directory }),
        };
        let branch = match git_line(&directory, &["rev-parse", "--abbrev-ref", "HEAD"]).await {
            Some(branch) => branch,
            None => return Err(WorkspaceError::NotARepository { path: directory }),
        };

        info!(
            "Opened workspace at {} ({} @ {})",
            directory.display(),
            branch,
            commit
        );

        Ok(Self {
            branch,
            commit,
            directory,
            environment: Vec::new(),
        })
    }

    /// Replace the declared environment overrides.
    #[must_use]
    pub fn with_environment(mut self, environment: Vec<(String, String)>) -> Self {
        self.environment = environment;
        self
    }
}

#[async_trait]
impl Workspace for GitWorkspace {
    fn branch(&self) -> &str {
        &self.branch
    }

    fn commit(&self) -> &str {
        &self.commit
    }

    fn directory(&self) -> &Path {
        &self.directory
    }

    fn environment(&self) -> &[(String, String)] {
        &self.environment
    }

    fn load_pipeline(&self) -> Result<Pipeline, WorkspaceError> {
        load_descriptor(&self.directory)
    }

    async fn execute_command(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<Vec<u8>, WorkspaceError> {
        process::run_command(&self.directory, &self.environment, cancel, program, args).await
    }
}

/// Run a git command in `dir` and return its trimmed single-line stdout.
async fn git_line(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let line = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}
