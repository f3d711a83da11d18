mod cli;
mod core;
mod execution;
mod workspace;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::commands::{RunCommand, ValidateCommand};
use cli::output::*;
use cli::{Cli, Command};
use crate::core::config::PipelineConfig;
use execution::{CancellationToken, Executor};
use std::path::Path;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use workspace::{GitWorkspace, Workspace};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let workspace = if let Some(remote) = &cmd.remote {
        GitWorkspace::clone_remote(Path::new(&cmd.staging), remote, &cmd.branch)
            .await
            .context("Failed to clone remote repository")?
    } else {
        GitWorkspace::open_local(cmd.path.as_str())
            .await
            .context("Failed to open local workspace")?
    }
    .with_environment(cmd.env.clone());

    println!(
        "{} Workspace: {}",
        INFO,
        format_workspace(workspace.branch(), workspace.commit(), workspace.directory())
    );

    let executor = Executor::new(workspace);
    let cancel = CancellationToken::new();

    // Ctrl-C cancels the in-flight command and stops the run
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    println!("{} Starting pipeline run", ROCKET);
    let started = Utc::now();

    let result = match &cmd.file {
        Some(file) => {
            let config =
                PipelineConfig::from_file(file).context("Failed to load pipeline config")?;
            let pipeline = config.to_pipeline();
            executor.run(&cancel, &pipeline).await
        }
        None => executor.run_default(&cancel).await,
    };

    let elapsed = (Utc::now() - started).to_std().unwrap_or_default();

    match result {
        Ok(transcript) => {
            println!();
            print!("{}", transcript);
            println!(
                "\n{} Pipeline completed {} in {}",
                CHECK,
                style("successfully").green(),
                format_duration(elapsed)
            );
            Ok(())
        }
        Err(err) => {
            println!();
            print!("{}", err.transcript());
            let verdict = if err.is_cancelled() {
                style("cancelled").yellow()
            } else {
                style("failed").red()
            };
            println!(
                "\n{} Pipeline {} after {}: {}",
                CROSS,
                verdict,
                format_duration(elapsed),
                style(&err).red()
            );
            std::process::exit(1);
        }
    }
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    let result = PipelineConfig::from_file(&cmd.file);

    match result {
        Ok(config) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Steps: {}", style(config.steps.len()).cyan());
            println!(
                "  Commands: {}",
                style(config.to_pipeline().command_count()).cyan()
            );

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}
