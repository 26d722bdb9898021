//! `imgstack build-all` command: build every stage of a project in order.

use clap::Args;

use imgstack_core::{HostIdentity, Pipeline};

use super::RunOptions;

#[derive(Args)]
pub struct BuildAllArgs {
    /// Project directory (contains imgstack.yaml or base-image/ and dev-image/)
    #[arg(default_value = ".")]
    pub path: String,

    /// Manifest to use instead of <PATH>/imgstack.yaml
    #[arg(short = 'm', long)]
    pub manifest: Option<String>,

    /// Do not use cache for any stage
    #[arg(long)]
    pub no_cache: bool,

    /// Build progress output for every stage
    #[arg(long, value_name = "MODE")]
    pub progress: Option<String>,

    #[command(flatten)]
    pub run: RunOptions,
}

pub async fn execute(args: BuildAllArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (project_dir, manifest) = super::load_manifest(&args.path, args.manifest.as_deref())?;

    let mut stages = manifest.stages(&project_dir);
    for stage in &mut stages {
        stage.config.no_cache |= args.no_cache;
        if let Some(progress) = &args.progress {
            stage.config.progress_mode = Some(progress.clone());
        }
    }

    let identity = HostIdentity::current();
    tracing::debug!(
        user = %identity.user_name,
        uid = identity.uid,
        gid = identity.gid,
        "Host identity"
    );

    let pipeline = Pipeline::new(stages)
        .with_identity(identity)
        .fail_fast(args.run.fail_fast);
    let engine = args.run.builder.unwrap_or(manifest.engine);

    super::run_pipeline(pipeline, engine, args.run.dry_run).await
}
