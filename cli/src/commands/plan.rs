//! `imgstack plan` command.

use clap::Args;

use imgstack_core::{BuildInvoker, DryRunner, Engine, HostIdentity, Pipeline};

use crate::output;

#[derive(Args)]
pub struct PlanArgs {
    /// Project directory
    #[arg(default_value = ".")]
    pub path: String,

    /// Manifest to use instead of <PATH>/imgstack.yaml
    #[arg(short = 'm', long)]
    pub manifest: Option<String>,

    /// Build engine the commands are rendered for
    #[arg(long, value_name = "BUILDER")]
    pub builder: Option<Engine>,

    /// Print the stage plans as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (project_dir, manifest) = super::load_manifest(&args.path, args.manifest.as_deref())?;
    let pipeline = Pipeline::new(manifest.stages(&project_dir)).with_identity(HostIdentity::current());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&pipeline.plan()?)?);
        return Ok(());
    }

    let resolved = pipeline.resolve()?;

    let invoker = BuildInvoker::new(args.builder.unwrap_or(manifest.engine), DryRunner);
    let mut table = output::new_table(&["STAGE", "PLATFORM", "TAG"]);
    for stage in &resolved {
        for build in &stage.plan.builds {
            table.add_row(vec![
                stage.plan.stage.as_str(),
                build.platform.as_deref().unwrap_or("host"),
                build.tag.as_str(),
            ]);
        }
    }
    println!("{table}");
    println!();

    for stage in &resolved {
        for build in &stage.plan.builds {
            println!(
                "{}",
                invoker.command(&build.tag, &build.options, &stage.config.context_dir)
            );
        }
    }
    Ok(())
}
