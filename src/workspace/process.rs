//! Subprocess execution primitive
//!
//! Spawns one external command, captures stdout and stderr interleaved
//! into a single buffer, and races completion against the run's
//! cancellation token.

use crate::execution::CancellationToken;
use crate::workspace::WorkspaceError;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Run `program` with `args`, rooted at `dir`, with `env` appended to the
/// ambient environment.
///
/// Both output streams drain into one shared buffer in arrival order. The
/// buffer travels back on every path: inside `Ok` on success, inside the
/// error on non-zero exit and on cancellation, so callers always see what
/// the command managed to write.
pub(crate) async fn run_command(
    dir: &Path,
    env: &[(String, String)],
    cancel: &CancellationToken,
    program: &str,
    args: &[String],
) -> Result<Vec<u8>, WorkspaceError> {
    let command = render(program, args);
    debug!("Spawning '{}' in {}", command, dir.display());

    let mut child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| WorkspaceError::CommandFailed {
            command: command.clone(),
            detail: format!("failed to spawn: {}", e),
            output: Vec::new(),
        })?;

    let sink: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let mut drains = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        drains.push(drain(stdout, sink.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        drains.push(drain(stderr, sink.clone()));
    }

    let status = tokio::select! {
        status = child.wait() => status,
        () = cancel.cancelled() => {
            warn!("Command '{}' cancelled, killing child process", command);
            let _ = child.kill().await;
            for handle in drains {
                let _ = handle.await;
            }
            let output = std::mem::take(&mut *sink.lock().await);
            return Err(WorkspaceError::Cancelled { command, output });
        }
    };

    // Pipes close once the child is gone, so the drains finish on their own.
    for handle in drains {
        let _ = handle.await;
    }
    let output = std::mem::take(&mut *sink.lock().await);

    let status = match status {
        Ok(status) => status,
        Err(e) => {
            return Err(WorkspaceError::CommandFailed {
                command,
                detail: format!("failed to wait for child: {}", e),
                output,
            });
        }
    };

    if status.success() {
        debug!("Command '{}' wrote {} bytes", command, output.len());
        Ok(output)
    } else {
        let detail = match status.code() {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        };
        Err(WorkspaceError::CommandFailed {
            command,
            detail,
            output,
        })
    }
}

fn drain<R>(mut stream: R, sink: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 8192];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => sink.lock().await.extend_from_slice(&buf[..n]),
            }
        }
    })
}

fn render(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}
