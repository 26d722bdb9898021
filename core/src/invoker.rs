//! Build invocation.
//!
//! A [`BuildInvoker`] turns one planned build into
//! `<engine> build <options> -t <tag> <context>` and runs it through a
//! [`CommandRunner`]. A failed build is logged and reported in the
//! [`BuildResult`]; it is never returned as an error. Whether to stop is the
//! caller's decision.

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::compose::{render, BuildOptions};
use crate::config::Engine;

/// Exit code reported when the engine could not be started.
pub const EXIT_SPAWN_FAILED: i32 = 127;

/// A fully assembled engine command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl BuildCommand {
    /// Value of the `-t` argument.
    pub fn tag(&self) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == "-t")
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Value of a `--build-arg KEY=VALUE` argument.
    pub fn build_arg(&self, key: &str) -> Option<&str> {
        let prefix = format!("{key}=");
        self.args
            .windows(2)
            .filter(|w| w[0] == "--build-arg")
            .filter_map(|w| w[1].strip_prefix(&prefix))
            .last()
    }
}

impl std::fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.program, render(&self.args))
    }
}

/// Executes a command and returns its exit code.
pub trait CommandRunner {
    fn execute(&self, command: &BuildCommand) -> std::io::Result<i32>;
}

/// Spawns the engine as a child process with inherited stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn execute(&self, command: &BuildCommand) -> std::io::Result<i32> {
        let status = std::process::Command::new(&command.program)
            .args(&command.args)
            .status()?;
        Ok(exit_code(status))
    }
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Logs commands without running them; every build succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunner;

impl CommandRunner for DryRunner {
    fn execute(&self, command: &BuildCommand) -> std::io::Result<i32> {
        tracing::debug!(command = %command, "Dry run, skipping");
        Ok(0)
    }
}

/// Records every command; builds whose tag is listed in `failing` exit 1.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    failing: Vec<String>,
    commands: Mutex<Vec<BuildCommand>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the build producing `tag` fail.
    pub fn failing_on(mut self, tag: impl Into<String>) -> Self {
        self.failing.push(tag.into());
        self
    }

    /// Commands executed so far, in order.
    pub fn commands(&self) -> Vec<BuildCommand> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn invocation_count(&self) -> usize {
        self.commands.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl CommandRunner for RecordingRunner {
    fn execute(&self, command: &BuildCommand) -> std::io::Result<i32> {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.clone());
        }
        let fails = command
            .tag()
            .is_some_and(|tag| self.failing.iter().any(|f| f == tag));
        Ok(if fails { 1 } else { 0 })
    }
}

/// Outcome of one build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// Command line that was executed
    pub command: String,
    /// Image reference the build targeted
    pub tag: String,
    /// Platform, absent for a host-platform build
    pub platform: Option<String>,
    /// Engine exit code
    pub exit_code: i32,
    /// Wall-clock duration
    pub elapsed: Duration,
}

impl BuildResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs builds through a [`CommandRunner`] for one engine.
#[derive(Debug)]
pub struct BuildInvoker<R> {
    engine: Engine,
    runner: R,
}

impl<R: CommandRunner> BuildInvoker<R> {
    pub fn new(engine: Engine, runner: R) -> Self {
        Self { engine, runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Assemble `<engine> build <options> -t <tag> <context_dir>`.
    pub fn command(&self, tag: &str, options: &BuildOptions, context_dir: &Path) -> BuildCommand {
        let mut args = Vec::with_capacity(options.as_slice().len() + 4);
        args.push("build".to_string());
        args.extend(options.as_slice().iter().cloned());
        args.push("-t".to_string());
        args.push(tag.to_string());
        args.push(context_dir.to_string_lossy().into_owned());
        BuildCommand {
            program: self.engine.program().to_string(),
            args,
        }
    }

    /// Run one build, blocking until the engine exits.
    pub fn invoke(
        &self,
        tag: &str,
        platform: Option<&str>,
        options: &BuildOptions,
        context_dir: &Path,
    ) -> BuildResult {
        let command = self.command(tag, options, context_dir);
        let line = command.to_string();
        tracing::info!("{line}");

        let started = Instant::now();
        let exit_code = match self.runner.execute(&command) {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(
                    engine = %self.engine,
                    error = %e,
                    "Failed to start build engine (is it installed?)"
                );
                EXIT_SPAWN_FAILED
            }
        };
        let elapsed = started.elapsed();

        if exit_code == 0 {
            tracing::info!(tag, elapsed_ms = elapsed.as_millis() as u64, "Build succeeded");
        } else {
            tracing::error!("'{line}' returned non-zero exit status: {exit_code}");
        }

        BuildResult {
            command: line,
            tag: tag.to_string(),
            platform: platform.map(str::to_string),
            exit_code,
            elapsed,
        }
    }
}
