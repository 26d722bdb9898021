//! `imgstack build` command: build one image from a Dockerfile.
//!
//! Fans out across `--platform` values and hands the resulting builds to
//! the engine one at a time.

use std::path::PathBuf;

use clap::Args;

use imgstack_core::config::{parse_build_args, parse_platforms};
use imgstack_core::{BuildConfig, Pipeline, Stage};

use super::RunOptions;

#[derive(Args)]
pub struct BuildArgs {
    /// Build context directory (contains Dockerfile and source files)
    #[arg(default_value = ".")]
    pub path: String,

    /// Path to Dockerfile (default: <PATH>/Dockerfile)
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Name for the image (default: <parent dir>-<dir>)
    #[arg(short = 'n', long = "name")]
    pub name: Option<String>,

    /// Name and optionally a tag (NAME[:TAG] or :TAG)
    #[arg(short = 't', long = "tag")]
    pub tag: Option<String>,

    /// Target build stage inside the Dockerfile
    #[arg(long)]
    pub target: Option<String>,

    /// Platforms to build for (e.g. "linux/amd64,linux/arm64/v8")
    #[arg(long, value_name = "PLATFORM[,PLATFORM...]")]
    pub platform: Option<String>,

    /// Set build-time variables (KEY=VALUE), can be repeated
    #[arg(long = "build-arg", value_name = "KEY=VALUE")]
    pub build_arg: Vec<String>,

    /// Do not use cache when building the image
    #[arg(long)]
    pub no_cache: bool,

    /// Build progress output (e.g. auto, plain, tty)
    #[arg(long, value_name = "MODE")]
    pub progress: Option<String>,

    /// Load the result into the local image store
    #[arg(long)]
    pub load: bool,

    #[command(flatten)]
    pub run: RunOptions,
}

impl BuildArgs {
    fn to_config(&self, context_dir: PathBuf) -> Result<BuildConfig, Box<dyn std::error::Error>> {
        let mut config = BuildConfig::for_dir(&context_dir);
        if let Some(file) = &self.file {
            let path = PathBuf::from(file);
            config.dockerfile_path = if path.is_absolute() {
                path
            } else {
                context_dir.join(path)
            };
        }
        if let Some(name) = &self.name {
            config.image_name = name.clone();
        }
        config.tag = self.tag.clone();
        config.target_stage = self.target.clone();
        config.platforms = self
            .platform
            .as_deref()
            .map(parse_platforms)
            .unwrap_or_default();
        config.build_args = parse_build_args(&self.build_arg)?;
        config.no_cache = self.no_cache;
        config.progress_mode = self.progress.clone();
        config.load = self.load;
        Ok(config)
    }
}

pub async fn execute(args: BuildArgs) -> Result<(), Box<dyn std::error::Error>> {
    let context_dir = super::resolve_dir(&args.path)?;
    let config = args.to_config(context_dir)?;

    let stage = config.image_name.clone();
    let pipeline = Pipeline::new(vec![Stage::new(stage, config)]).fail_fast(args.run.fail_fast);

    super::run_pipeline(
        pipeline,
        args.run.builder.unwrap_or_default(),
        args.run.dry_run,
    )
    .await
}
