//! Project manifest (`imgstack.yaml`).
//!
//! Describes the stages of a project in build order:
//!
//! ```yaml
//! engine: docker
//! stages:
//!   - name: base
//!     dir: base-image
//!     platforms: [linux/amd64, linux/arm64/v8]
//!     load: true
//!   - name: dev
//!     dir: dev-image
//!     target: dev
//!     platforms: [linux/amd64]
//!     base_image: { stage: base, platform: linux/amd64 }
//!     host_identity: true
//! ```
//!
//! A project without a manifest gets the same two stages by convention.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{BuildConfig, Engine, DEFAULT_DOCKERFILE};
use crate::error::{Result, StackError};
use crate::pipeline::{BaseImageRef, Stage};

/// Manifest file name looked up in the project directory.
pub const MANIFEST_FILE: &str = "imgstack.yaml";

const BASE_STAGE: &str = "base";
const DEV_STAGE: &str = "dev";
const BASE_IMAGE_DIR: &str = "base-image";
const DEV_IMAGE_DIR: &str = "dev-image";
const BASE_PLATFORMS: [&str; 2] = ["linux/amd64", "linux/arm64/v8"];
const DEV_PLATFORM: &str = "linux/amd64";

/// Project-wide build settings and ordered stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub engine: Engine,
    /// Applies to every stage
    #[serde(default)]
    pub no_cache: bool,
    /// Default progress mode for every stage
    #[serde(default)]
    pub progress: Option<String>,
    pub stages: Vec<StageSpec>,
}

/// One stage as written in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageSpec {
    pub name: String,
    /// Stage directory, relative to the project
    pub dir: PathBuf,
    /// Build file, relative to the stage directory
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Image name, defaults to `<project>-<dir>`
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub build_args: IndexMap<String, String>,
    #[serde(default)]
    pub no_cache: bool,
    #[serde(default)]
    pub progress: Option<String>,
    #[serde(default)]
    pub load: bool,
    #[serde(default)]
    pub base_image: Option<BaseImageRef>,
    #[serde(default)]
    pub host_identity: bool,
}

impl StageSpec {
    fn new(name: &str, dir: &str) -> Self {
        Self {
            name: name.to_string(),
            dir: PathBuf::from(dir),
            file: None,
            image: None,
            tag: None,
            target: None,
            platforms: Vec::new(),
            build_args: IndexMap::new(),
            no_cache: false,
            progress: None,
            load: false,
            base_image: None,
            host_identity: false,
        }
    }
}

impl Manifest {
    /// Parse a manifest from YAML text.
    pub fn parse(yaml: &str) -> Result<Self> {
        let manifest: Self = serde_yaml::from_str(yaml)?;
        if manifest.stages.is_empty() {
            return Err(StackError::ConfigError(
                "manifest declares no stages".to_string(),
            ));
        }
        Ok(manifest)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            StackError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&yaml)
    }

    /// Load `<project_dir>/imgstack.yaml`, or the conventional layout if absent.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(MANIFEST_FILE);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "Loading manifest");
            Self::from_file(&path)
        } else {
            tracing::debug!(
                project = %project_dir.display(),
                "No manifest found, using base-image/dev-image layout"
            );
            Ok(Self::conventional())
        }
    }

    /// Multi-arch `base-image`, then a host-arch `dev-image` built on top of it.
    pub fn conventional() -> Self {
        let mut base = StageSpec::new(BASE_STAGE, BASE_IMAGE_DIR);
        base.platforms = BASE_PLATFORMS.iter().map(|p| p.to_string()).collect();
        base.load = true;

        let mut dev = StageSpec::new(DEV_STAGE, DEV_IMAGE_DIR);
        dev.platforms = vec![DEV_PLATFORM.to_string()];
        dev.target = Some(DEV_STAGE.to_string());
        dev.base_image = Some(BaseImageRef::new(BASE_STAGE).platform(DEV_PLATFORM));
        dev.host_identity = true;

        Self {
            engine: Engine::default(),
            no_cache: false,
            progress: None,
            stages: vec![base, dev],
        }
    }

    /// Pipeline stages with paths resolved against `project_dir`.
    pub fn stages(&self, project_dir: &Path) -> Vec<Stage> {
        self.stages
            .iter()
            .map(|spec| {
                let context_dir = project_dir.join(&spec.dir);
                let mut config = BuildConfig::for_dir(&context_dir);
                config.dockerfile_path =
                    context_dir.join(spec.file.as_deref().unwrap_or(Path::new(DEFAULT_DOCKERFILE)));
                if let Some(image) = &spec.image {
                    config.image_name = image.clone();
                }
                config.tag = spec.tag.clone();
                config.target_stage = spec.target.clone();
                config.platforms = spec.platforms.clone();
                config.build_args = spec.build_args.clone();
                config.no_cache = self.no_cache || spec.no_cache;
                config.progress_mode = spec.progress.clone().or_else(|| self.progress.clone());
                config.load = spec.load;

                let mut stage = Stage::new(&spec.name, config);
                stage.base_image = spec.base_image.clone();
                stage.host_identity = spec.host_identity;
                stage
            })
            .collect()
    }
}
