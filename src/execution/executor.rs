//! Pipeline executor - sequential, fail-fast command orchestration

use crate::core::{CommandLine, Pipeline};
use crate::execution::{CancellationToken, Transcript};
use crate::workspace::{Workspace, WorkspaceError};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Errors from a single pipeline run
#[derive(Debug, Error)]
pub enum RunError {
    /// The workspace could not produce a pipeline; nothing was executed
    #[error("failed to load pipeline descriptor: {0}")]
    Descriptor(#[source] WorkspaceError),

    /// A command string tokenized to nothing
    #[error("step '{step}' contains an empty command")]
    EmptyCommand { step: String, transcript: String },

    /// A command failed or was cancelled; the transcript holds everything
    /// produced up to and including that command
    #[error("step '{step}': command '{command}' failed: {source}")]
    Command {
        step: String,
        command: String,
        transcript: String,
        #[source]
        source: WorkspaceError,
    },
}

impl RunError {
    /// The partial transcript accumulated before the failure.
    ///
    /// Empty for [`RunError::Descriptor`], where no pipeline was available
    /// and nothing ran.
    pub fn transcript(&self) -> &str {
        match self {
            RunError::Descriptor(_) => "",
            RunError::EmptyCommand { transcript, .. } => transcript,
            RunError::Command { transcript, .. } => transcript,
        }
    }

    /// Whether the run stopped because the cancellation token fired.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            RunError::Command {
                source: WorkspaceError::Cancelled { .. },
                ..
            }
        )
    }
}

/// Runs pipelines against a single workspace.
///
/// One executor owns one workspace, and one `run` call owns its transcript;
/// nothing here is shared between concurrent runs. Steps and commands
/// execute strictly in order, one subprocess at a time, so a given pipeline
/// and repository state always produce the same transcript.
pub struct Executor<W> {
    workspace: W,
}

impl<W: Workspace> Executor<W> {
    pub fn new(workspace: W) -> Self {
        Self { workspace }
    }

    /// The workspace this executor is bound to.
    pub fn workspace(&self) -> &W {
        &self.workspace
    }

    /// Run every command of every step in order, stopping at the first
    /// failure.
    ///
    /// The transcript opens with the pipeline header, gains one header per
    /// step, and gains each command's combined output plus a separator —
    /// also for the command that fails. Cancellation kills the in-flight
    /// command; commands not yet started are never started.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        pipeline: &Pipeline,
    ) -> Result<String, RunError> {
        let run_id = Uuid::new_v4();
        info!("Executing pipeline: {} ({})", pipeline.name, run_id);

        let mut transcript = Transcript::new(&pipeline.name);

        for step in &pipeline.steps {
            info!("Step: {} ({})", step.name, run_id);
            transcript.begin_step(&step.name);

            for raw in &step.commands {
                if cancel.is_cancelled() {
                    info!("Run {} cancelled before '{}'", run_id, raw);
                    return Err(RunError::Command {
                        step: step.name.clone(),
                        command: raw.clone(),
                        transcript: transcript.into_string(),
                        source: WorkspaceError::Cancelled {
                            command: raw.clone(),
                            output: Vec::new(),
                        },
                    });
                }

                let Some(line) = CommandLine::parse(raw) else {
                    return Err(RunError::EmptyCommand {
                        step: step.name.clone(),
                        transcript: transcript.into_string(),
                    });
                };

                debug!("Running '{}' in step '{}'", raw, step.name);
                match self
                    .workspace
                    .execute_command(cancel, &line.program, &line.args)
                    .await
                {
                    Ok(output) => transcript.append_output(&output),
                    Err(err) => {
                        error!("Command '{}' in step '{}' failed: {}", raw, step.name, err);
                        transcript.append_output(err.output());
                        return Err(RunError::Command {
                            step: step.name.clone(),
                            command: raw.clone(),
                            transcript: transcript.into_string(),
                            source: err,
                        });
                    }
                }
            }
        }

        info!("Pipeline {} completed ({})", pipeline.name, run_id);
        Ok(transcript.into_string())
    }

    /// Load the workspace's default descriptor and run it.
    ///
    /// A loader failure returns before any subprocess starts, with no
    /// transcript to hand back.
    pub async fn run_default(&self, cancel: &CancellationToken) -> Result<String, RunError> {
        let pipeline = self
            .workspace
            .load_pipeline()
            .map_err(RunError::Descriptor)?;
        self.run(cancel, &pipeline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PipelineConfig, Step};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Scripted workspace double: hands out canned results in call order
    /// and records every command it was asked to run.
    struct StubWorkspace {
        directory: PathBuf,
        environment: Vec<(String, String)>,
        results: Mutex<Vec<Result<Vec<u8>, WorkspaceError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubWorkspace {
        fn new(results: Vec<Result<Vec<u8>, WorkspaceError>>) -> Self {
            Self {
                directory: PathBuf::from("/stub"),
                environment: Vec::new(),
                results: Mutex::new(results),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Workspace for StubWorkspace {
        fn branch(&self) -> &str {
            "main"
        }

        fn commit(&self) -> &str {
            "0000000000000000000000000000000000000000"
        }

        fn directory(&self) -> &Path {
            &self.directory
        }

        fn environment(&self) -> &[(String, String)] {
            &self.environment
        }

        fn load_pipeline(&self) -> Result<Pipeline, WorkspaceError> {
            Err(WorkspaceError::DescriptorNotFound {
                path: self.directory.join(crate::workspace::DESCRIPTOR_PATH),
            })
        }

        async fn execute_command(
            &self,
            _cancel: &CancellationToken,
            program: &str,
            args: &[String],
        ) -> Result<Vec<u8>, WorkspaceError> {
            let mut rendered = program.to_string();
            for arg in args {
                rendered.push(' ');
                rendered.push_str(arg);
            }
            self.calls.lock().unwrap().push(rendered);

            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                Ok(Vec::new())
            } else {
                results.remove(0)
            }
        }
    }

    fn pipeline_from_yaml(yaml: &str) -> Pipeline {
        PipelineConfig::from_yaml(yaml).unwrap().to_pipeline()
    }

    #[tokio::test]
    async fn test_single_step_transcript() {
        let pipeline = pipeline_from_yaml(
            r#"
name: "Test Pipeline"
steps:
  - name: "Step 1"
    commands:
      - "cmd1 arg1 arg2"
"#,
        );

        let workspace = StubWorkspace::new(vec![Ok(b"Output".to_vec())]);
        let executor = Executor::new(workspace);
        let cancel = CancellationToken::new();

        let transcript = executor.run(&cancel, &pipeline).await.unwrap();
        assert_eq!(
            transcript,
            "Executing pipeline: Test Pipeline\nStep: Step 1\nOutput\n"
        );
        assert_eq!(executor.workspace().calls(), vec!["cmd1 arg1 arg2"]);
    }

    #[tokio::test]
    async fn test_empty_pipeline_transcript() {
        let pipeline = pipeline_from_yaml("name: \"Empty\"\nsteps: []\n");

        let workspace = StubWorkspace::new(vec![]);
        let executor = Executor::new(workspace);
        let cancel = CancellationToken::new();

        let transcript = executor.run(&cancel, &pipeline).await.unwrap();
        assert_eq!(transcript, "Executing pipeline: Empty\n");
        assert!(executor.workspace().calls().is_empty());
    }

    #[tokio::test]
    async fn test_step_without_commands_contributes_header_only() {
        let pipeline = pipeline_from_yaml(
            r#"
name: "P"
steps:
  - name: "Noop"
    commands: []
  - name: "Real"
    commands: ["run it"]
"#,
        );

        let workspace = StubWorkspace::new(vec![Ok(b"ok".to_vec())]);
        let executor = Executor::new(workspace);
        let cancel = CancellationToken::new();

        let transcript = executor.run(&cancel, &pipeline).await.unwrap();
        assert_eq!(
            transcript,
            "Executing pipeline: P\nStep: Noop\nStep: Real\nok\n"
        );
    }

    #[tokio::test]
    async fn test_fail_fast_stops_at_first_failure() {
        let pipeline = pipeline_from_yaml(
            r#"
name: "P"
steps:
  - name: "One"
    commands: ["a", "b"]
  - name: "Two"
    commands: ["c"]
"#,
        );

        let workspace = StubWorkspace::new(vec![
            Ok(b"a-out".to_vec()),
            Err(WorkspaceError::CommandFailed {
                command: "b".to_string(),
                detail: "exited with status 1".to_string(),
                output: b"b-partial".to_vec(),
            }),
        ]);
        let executor = Executor::new(workspace);
        let cancel = CancellationToken::new();

        let err = executor.run(&cancel, &pipeline).await.unwrap_err();

        match &err {
            RunError::Command { step, command, transcript, .. } => {
                assert_eq!(step, "One");
                assert_eq!(command, "b");
                // Failing command's flushed output is preserved; nothing
                // from command "c" or step "Two" appears.
                assert_eq!(
                    transcript,
                    "Executing pipeline: P\nStep: One\na-out\nb-partial\n"
                );
            }
            other => panic!("Expected Command error, got {:?}", other),
        }

        assert_eq!(executor.workspace().calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_run_default_loader_failure_runs_nothing() {
        let workspace = StubWorkspace::new(vec![Ok(b"should never run".to_vec())]);
        let executor = Executor::new(workspace);
        let cancel = CancellationToken::new();

        let err = executor.run_default(&cancel).await.unwrap_err();

        assert!(matches!(err, RunError::Descriptor(_)));
        assert_eq!(err.transcript(), "");
        assert!(executor.workspace().calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_prevents_start() {
        let pipeline = pipeline_from_yaml(
            r#"
name: "P"
steps:
  - name: "One"
    commands: ["a"]
"#,
        );

        let workspace = StubWorkspace::new(vec![Ok(b"never".to_vec())]);
        let executor = Executor::new(workspace);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = executor.run(&cancel, &pipeline).await.unwrap_err();

        assert!(err.is_cancelled());
        // The step header was already written; the command never ran.
        assert_eq!(err.transcript(), "Executing pipeline: P\nStep: One\n");
        assert!(executor.workspace().calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_command_in_literal_pipeline() {
        // Bypasses descriptor validation on purpose.
        let pipeline = Pipeline {
            name: "P".to_string(),
            steps: vec![Step {
                name: "Broken".to_string(),
                commands: vec!["   ".to_string()],
            }],
        };

        let workspace = StubWorkspace::new(vec![]);
        let executor = Executor::new(workspace);
        let cancel = CancellationToken::new();

        let err = executor.run(&cancel, &pipeline).await.unwrap_err();

        match &err {
            RunError::EmptyCommand { step, transcript } => {
                assert_eq!(step, "Broken");
                assert_eq!(transcript, "Executing pipeline: P\nStep: Broken\n");
            }
            other => panic!("Expected EmptyCommand, got {:?}", other),
        }
        assert!(executor.workspace().calls().is_empty());
    }
}
