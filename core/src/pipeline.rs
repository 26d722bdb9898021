//! Dependency-ordered build orchestration.
//!
//! A [`Pipeline`] runs its stages strictly in order. Before anything is
//! invoked every stage is resolved: upstream tags and host identity are
//! injected as build args, each stage is fanned out, and derived tags are
//! checked for collisions across stages. The run then walks the stages one
//! build at a time and stops at the first stage with a failing build.
//!
//! ```text
//! Pending -> Running(0) -> Running(1) -> ... -> Completed
//!                 \             \
//!                  +-> Aborted   +-> Aborted
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::BuildConfig;
use crate::error::{Result, StackError};
use crate::identity::HostIdentity;
use crate::invoker::{BuildInvoker, BuildResult, CommandRunner};
use crate::plan::{expand, PlannedBuild, StagePlan};

/// Build arg that receives the upstream image reference by default.
pub const DEFAULT_BASE_IMAGE_ARG: &str = "BASE_IMAGE";

fn default_base_image_arg() -> String {
    DEFAULT_BASE_IMAGE_ARG.to_string()
}

/// Reference from a stage to the image produced by an earlier stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseImageRef {
    /// Name of the upstream stage
    pub stage: String,
    /// Upstream platform build to use
    #[serde(default)]
    pub platform: Option<String>,
    /// Build arg that receives the reference
    #[serde(default = "default_base_image_arg")]
    pub arg: String,
}

impl BaseImageRef {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            platform: None,
            arg: default_base_image_arg(),
        }
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

/// One named build step.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: String,
    pub config: BuildConfig,
    pub base_image: Option<BaseImageRef>,
    /// Inject `USERNAME`, `USER_ID` and `GROUP_ID`
    pub host_identity: bool,
}

impl Stage {
    pub fn new(name: impl Into<String>, config: BuildConfig) -> Self {
        Self {
            name: name.into(),
            config,
            base_image: None,
            host_identity: false,
        }
    }

    pub fn with_base_image(mut self, base_image: BaseImageRef) -> Self {
        self.base_image = Some(base_image);
        self
    }

    pub fn with_host_identity(mut self) -> Self {
        self.host_identity = true;
        self
    }
}

/// Where a run is, or where it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Pending,
    Running { stage: usize },
    Aborted { stage: String, reason: String },
    Completed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running { stage } => write!(f, "RUNNING({stage})"),
            Self::Aborted { stage, .. } => write!(f, "ABORTED({stage})"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// Builds executed for one stage.
#[derive(Debug, Clone)]
pub struct StageResult {
    pub stage: String,
    pub builds: Vec<BuildResult>,
}

impl StageResult {
    pub fn succeeded(&self) -> bool {
        self.builds.iter().all(BuildResult::succeeded)
    }
}

/// Final state of a run plus every build it executed.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub state: PipelineState,
    pub stages: Vec<StageResult>,
}

impl PipelineOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Completed
    }

    /// Tags of successful builds, in build order.
    pub fn produced_tags(&self) -> Vec<String> {
        self.builds()
            .filter(|b| b.succeeded())
            .map(|b| b.tag.clone())
            .collect()
    }

    /// Every executed build, in order.
    pub fn builds(&self) -> impl Iterator<Item = &BuildResult> {
        self.stages.iter().flat_map(|s| s.builds.iter())
    }

    /// First failing build, if any.
    pub fn first_failure(&self) -> Option<&BuildResult> {
        self.builds().find(|b| !b.succeeded())
    }
}

/// A stage with its injected config and expanded builds.
#[derive(Debug, Clone)]
pub struct ResolvedStage {
    pub config: BuildConfig,
    pub plan: StagePlan,
}

/// Ordered multi-stage build.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
    identity: Option<HostIdentity>,
    fail_fast: bool,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            stages,
            identity: None,
            fail_fast: false,
        }
    }

    /// Identity injected into stages that ask for it.
    pub fn with_identity(mut self, identity: HostIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Stop a stage at its first failing build instead of finishing its fan-out.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Resolve every stage without invoking anything.
    pub fn resolve(&self) -> Result<Vec<ResolvedStage>> {
        self.resolve_stages().map_err(|(_, e)| e)
    }

    /// Expanded build plans for every stage.
    pub fn plan(&self) -> Result<Vec<StagePlan>> {
        Ok(self.resolve()?.into_iter().map(|r| r.plan).collect())
    }

    fn resolve_stages(&self) -> std::result::Result<Vec<ResolvedStage>, (usize, StackError)> {
        let mut resolved: Vec<ResolvedStage> = Vec::with_capacity(self.stages.len());
        let mut owners: HashMap<String, &str> = HashMap::new();

        for (index, stage) in self.stages.iter().enumerate() {
            let fail = |e: StackError| (index, e);

            if self.stages[..index].iter().any(|s| s.name == stage.name) {
                return Err(fail(StackError::ConfigError(format!(
                    "duplicate stage name '{}'",
                    stage.name
                ))));
            }

            let mut config = stage.config.clone();

            if let Some(base) = &stage.base_image {
                let upstream = resolved
                    .iter()
                    .find(|r| r.plan.stage == base.stage)
                    .ok_or_else(|| {
                        fail(StackError::UnknownStage {
                            stage: stage.name.clone(),
                            upstream: base.stage.clone(),
                        })
                    })?;
                let build = select_upstream_build(stage, base, &upstream.plan).map_err(fail)?;
                tracing::debug!(
                    stage = %stage.name,
                    arg = %base.arg,
                    tag = %build.tag,
                    "Injecting upstream image"
                );
                config.set_build_arg(base.arg.clone(), build.tag.clone());
            }

            if stage.host_identity {
                let identity = self.identity.as_ref().ok_or_else(|| {
                    fail(StackError::ConfigError(format!(
                        "stage '{}' needs the host identity but none was provided",
                        stage.name
                    )))
                })?;
                for (key, value) in identity.build_args() {
                    config.set_build_arg(key, value);
                }
            }

            let plan = expand(&stage.name, &config);
            for tag in plan.tags() {
                match owners.get(tag) {
                    Some(owner) if *owner != stage.name => {
                        return Err(fail(StackError::TagCollision {
                            tag: tag.to_string(),
                            first: owner.to_string(),
                            second: stage.name.clone(),
                        }));
                    }
                    Some(_) => {}
                    None => {
                        owners.insert(tag.to_string(), &stage.name);
                    }
                }
            }

            resolved.push(ResolvedStage { config, plan });
        }

        Ok(resolved)
    }

    /// Run every stage in order, stopping at the first failing stage.
    pub fn run<R: CommandRunner>(&self, invoker: &BuildInvoker<R>) -> PipelineOutcome {
        let mut outcome = PipelineOutcome {
            state: PipelineState::Pending,
            stages: Vec::new(),
        };

        let resolved = match self.resolve_stages() {
            Ok(resolved) => resolved,
            Err((index, e)) => {
                let stage = self.stages[index].name.clone();
                tracing::error!(stage = %stage, "Configuration error: {e}");
                outcome.state = PipelineState::Aborted {
                    stage,
                    reason: e.to_string(),
                };
                return outcome;
            }
        };

        for (index, ResolvedStage { config, plan }) in resolved.iter().enumerate() {
            outcome.state = PipelineState::Running { stage: index };
            tracing::info!(
                stage = %plan.stage,
                builds = plan.builds.len(),
                "Starting stage {}/{}",
                index + 1,
                resolved.len()
            );

            if let Err(e) = config.check_build_file() {
                tracing::error!(stage = %plan.stage, "{e}");
                outcome.state = PipelineState::Aborted {
                    stage: plan.stage.clone(),
                    reason: e.to_string(),
                };
                return outcome;
            }

            let mut builds = Vec::with_capacity(plan.builds.len());
            for build in &plan.builds {
                let result = invoker.invoke(
                    &build.tag,
                    build.platform.as_deref(),
                    &build.options,
                    &config.context_dir,
                );
                let failed = !result.succeeded();
                builds.push(result);
                if failed && self.fail_fast {
                    break;
                }
            }

            let stage_result = StageResult {
                stage: plan.stage.clone(),
                builds,
            };
            let failure = stage_result
                .builds
                .iter()
                .find(|b| !b.succeeded())
                .map(|b| format!("'{}' exited with status {}", b.command, b.exit_code));
            outcome.stages.push(stage_result);

            if let Some(reason) = failure {
                tracing::error!(stage = %plan.stage, "Stage failed, aborting: {reason}");
                outcome.state = PipelineState::Aborted {
                    stage: plan.stage.clone(),
                    reason,
                };
                return outcome;
            }
        }

        outcome.state = PipelineState::Completed;
        let built: String = outcome
            .produced_tags()
            .iter()
            .map(|t| format!("\n{t}"))
            .collect();
        tracing::info!("Finished building:{built}");
        outcome
    }
}

fn select_upstream_build<'a>(
    stage: &Stage,
    base: &BaseImageRef,
    upstream: &'a StagePlan,
) -> Result<&'a PlannedBuild> {
    if let Some(platform) = &base.platform {
        return upstream
            .for_platform(platform)
            .ok_or_else(|| StackError::PlatformNotBuilt {
                stage: stage.name.clone(),
                upstream: base.stage.clone(),
                platform: platform.clone(),
            });
    }

    stage
        .config
        .platforms
        .first()
        .and_then(|p| upstream.for_platform(p))
        .or_else(|| upstream.builds.first())
        .ok_or_else(|| {
            StackError::ConfigError(format!("stage '{}' produces no builds", base.stage))
        })
}
