//! Build configuration for a single stage.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StackError};

/// Conventional build-file name inside a stage directory.
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// Image name used when the stage directory has no usable name.
const FALLBACK_IMAGE_NAME: &str = "image";

/// Container build engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    #[default]
    Docker,
    Podman,
}

impl Engine {
    /// Executable name of the engine.
    pub fn program(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

impl std::str::FromStr for Engine {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            _ => Err(StackError::UnknownEngine(s.to_string())),
        }
    }
}

/// Declarative description of one build stage.
///
/// Owned by the caller and not mutated once the pipeline starts; the
/// pipeline works on clones when it injects build args.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Build context handed to the engine
    pub context_dir: PathBuf,
    /// Path to the build file
    pub dockerfile_path: PathBuf,
    /// Base image name, used when no tag is given
    pub image_name: String,
    /// `NAME`, `NAME:TAG` or `:TAG`
    pub tag: Option<String>,
    /// Named stage inside the build file
    pub target_stage: Option<String>,
    /// Platforms to build for; empty means the host platform
    pub platforms: Vec<String>,
    /// Build-time variables, in insertion order
    pub build_args: IndexMap<String, String>,
    /// Pass `--no-cache`
    pub no_cache: bool,
    /// Pass `--progress=<mode>`
    pub progress_mode: Option<String>,
    /// Pass `--load`
    pub load: bool,
}

impl BuildConfig {
    /// Configuration with conventional defaults for a stage directory.
    pub fn for_dir(context_dir: impl Into<PathBuf>) -> Self {
        let context_dir = context_dir.into();
        Self {
            dockerfile_path: context_dir.join(DEFAULT_DOCKERFILE),
            image_name: default_image_name(&context_dir),
            context_dir,
            tag: None,
            target_stage: None,
            platforms: Vec::new(),
            build_args: IndexMap::new(),
            no_cache: false,
            progress_mode: None,
            load: false,
        }
    }

    /// The `name[:tag]` string fed to the tag deriver.
    pub fn reference(&self) -> String {
        match self.tag.as_deref() {
            None | Some("") => self.image_name.clone(),
            Some(tag) if tag.starts_with(':') => format!("{}{}", self.image_name, tag),
            Some(tag) => tag.to_string(),
        }
    }

    /// Set a build arg; an existing key keeps its position and takes the new value.
    pub fn set_build_arg(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.build_args.insert(key.into(), value.into());
    }

    /// Fail unless the build file exists.
    pub fn check_build_file(&self) -> Result<()> {
        if self.dockerfile_path.is_file() {
            Ok(())
        } else {
            Err(StackError::MissingBuildFile {
                path: self.dockerfile_path.clone(),
            })
        }
    }
}

/// Default image name: `<grandparent>-<parent>` of the stage directory.
///
/// `/work/proj/base-image` → `proj-base-image`.
pub fn default_image_name(context_dir: &Path) -> String {
    let name_of = |p: &Path| {
        p.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
    };
    let parent = name_of(context_dir);
    let grandparent = context_dir.parent().and_then(name_of);
    match (grandparent, parent) {
        (Some(g), Some(p)) => format!("{g}-{p}"),
        (None, Some(p)) => p,
        _ => FALLBACK_IMAGE_NAME.to_string(),
    }
}

/// Parse KEY=VALUE pairs, keeping first-seen order; later duplicates win.
pub fn parse_build_args(args: &[String]) -> Result<IndexMap<String, String>> {
    let mut map = IndexMap::new();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| StackError::InvalidBuildArg(arg.clone()))?;
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

/// Split a comma-separated platform list, dropping empty segments.
pub fn parse_platforms(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
