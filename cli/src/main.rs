//! imgstack CLI entry point.

use std::io::IsTerminal;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use imgstack_cli::commands::{dispatch, Cli};

#[tokio::main]
async fn main() {
    // Build commands are logged at info level; stdout stays free for plan output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(e) = dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
