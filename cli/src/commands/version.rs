//! `imgstack version` command.

use clap::Args;

#[derive(Args)]
pub struct VersionArgs;

pub async fn execute(_args: VersionArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("imgstack version {}", imgstack_core::VERSION);
    Ok(())
}
