//! CLI command definitions and dispatch.

mod build;
mod build_all;
mod plan;
mod version;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use imgstack_core::{
    BuildInvoker, DryRunner, Engine, Manifest, Pipeline, PipelineOutcome, ProcessRunner,
};

/// imgstack - ordered multi-platform container image builds.
#[derive(Parser)]
#[command(name = "imgstack", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Build one image, once per platform
    Build(build::BuildArgs),
    /// Build every stage of a project in order
    BuildAll(build_all::BuildAllArgs),
    /// Show the builds a project would run
    Plan(plan::PlanArgs),
    /// Show version information
    Version(version::VersionArgs),
}

/// Flags shared by the commands that run builds.
#[derive(Args)]
pub struct RunOptions {
    /// Build engine to invoke (docker or podman)
    #[arg(long, value_name = "BUILDER")]
    pub builder: Option<Engine>,

    /// Stop a stage at its first failing build
    #[arg(long)]
    pub fail_fast: bool,

    /// Log the build commands without running them
    #[arg(long)]
    pub dry_run: bool,
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Build(args) => build::execute(args).await,
        Command::BuildAll(args) => build_all::execute(args).await,
        Command::Plan(args) => plan::execute(args).await,
        Command::Version(args) => version::execute(args).await,
    }
}

/// Canonical project or context directory.
pub(crate) fn resolve_dir(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = PathBuf::from(path)
        .canonicalize()
        .map_err(|e| format!("Invalid directory '{}': {}", path, e))?;
    if !dir.is_dir() {
        return Err(format!("'{}' is not a directory", dir.display()).into());
    }
    Ok(dir)
}

/// Load an explicit manifest, or the project's own (or conventional) one.
///
/// Returns the directory stage paths are relative to.
pub(crate) fn load_manifest(
    project: &str,
    manifest: Option<&str>,
) -> Result<(PathBuf, Manifest), Box<dyn std::error::Error>> {
    match manifest {
        Some(file) => {
            let file = PathBuf::from(file)
                .canonicalize()
                .map_err(|e| format!("Invalid manifest path '{}': {}", file, e))?;
            let project_dir = file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            Ok((project_dir, Manifest::from_file(&file)?))
        }
        None => {
            let project_dir = resolve_dir(project)?;
            let manifest = Manifest::load(&project_dir)?;
            Ok((project_dir, manifest))
        }
    }
}

/// Run a pipeline on a blocking thread and print its summary.
///
/// Returns an error when the run aborted so the process exits non-zero.
pub(crate) async fn run_pipeline(
    pipeline: Pipeline,
    engine: Engine,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome: PipelineOutcome = tokio::task::spawn_blocking(move || {
        if dry_run {
            pipeline.run(&BuildInvoker::new(engine, DryRunner))
        } else {
            pipeline.run(&BuildInvoker::new(engine, ProcessRunner))
        }
    })
    .await?;

    crate::output::print_summary(&outcome);

    match outcome.state {
        imgstack_core::PipelineState::Completed => Ok(()),
        imgstack_core::PipelineState::Aborted { stage, reason } => {
            Err(format!("Aborted at stage '{stage}': {reason}").into())
        }
        state => Err(format!("Pipeline ended in state {state}").into()),
    }
}
