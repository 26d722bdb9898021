//! Platform fan-out.
//!
//! Expands one [`BuildConfig`] into the ordered builds it produces: one per
//! platform, or a single host-platform build when no platforms are given.
//! Duplicate platforms are built twice.

use serde::Serialize;

use crate::compose::{compose, BuildOptions};
use crate::config::BuildConfig;
use crate::tag::derive;

/// One concrete build of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedBuild {
    /// Derived image reference
    pub tag: String,
    /// Platform, absent for a host-platform build
    pub platform: Option<String>,
    /// Engine flags, excluding `-t` and the context
    pub options: BuildOptions,
}

/// Ordered builds for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagePlan {
    pub stage: String,
    pub builds: Vec<PlannedBuild>,
}

impl StagePlan {
    /// Derived tags in build order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.builds.iter().map(|b| b.tag.as_str())
    }

    /// The build for `platform`, if this stage produces one.
    pub fn for_platform(&self, platform: &str) -> Option<&PlannedBuild> {
        self.builds
            .iter()
            .find(|b| b.platform.as_deref() == Some(platform))
    }
}

/// Expand a stage configuration into its planned builds.
pub fn expand(stage: &str, config: &BuildConfig) -> StagePlan {
    let reference = config.reference();
    let options = compose(config);

    let builds = if config.platforms.is_empty() {
        vec![PlannedBuild {
            tag: derive(&reference, config.target_stage.as_deref()),
            platform: None,
            options,
        }]
    } else {
        config
            .platforms
            .iter()
            .map(|platform| {
                let mut platform_options = BuildOptions::new();
                platform_options.push(format!("--platform={platform}"));
                platform_options.extend(options.clone());
                PlannedBuild {
                    tag: derive(&reference, Some(platform)),
                    platform: Some(platform.clone()),
                    options: platform_options,
                }
            })
            .collect()
    };

    StagePlan {
        stage: stage.to_string(),
        builds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(platforms: &[&str]) -> BuildConfig {
        let mut config = BuildConfig::for_dir("/work/proj/base-image");
        config.platforms = platforms.iter().map(|p| p.to_string()).collect();
        config
    }

    #[test]
    fn test_no_platforms_single_build() {
        let plan = expand("base", &config(&[]));
        assert_eq!(plan.builds.len(), 1);
        let build = &plan.builds[0];
        assert_eq!(build.tag, "proj-base-image:latest");
        assert_eq!(build.platform, None);
        assert!(!build
            .options
            .as_slice()
            .iter()
            .any(|o| o.starts_with("--platform")));
    }

    #[test]
    fn test_no_platforms_uses_target_qualifier() {
        let mut config = config(&[]);
        config.tag = Some("myimg".to_string());
        config.target_stage = Some("dev".to_string());
        let plan = expand("dev", &config);
        assert_eq!(plan.builds[0].tag, "myimg-dev:latest");
    }

    #[test]
    fn test_platforms_in_order_with_distinct_tags() {
        let plan = expand("base", &config(&["linux/amd64", "linux/arm64/v8"]));
        let tags: Vec<_> = plan.tags().collect();
        assert_eq!(
            tags,
            vec![
                "proj-base-image-linux/amd64:latest",
                "proj-base-image-linux/arm64/v8:latest"
            ]
        );
        assert_eq!(plan.builds[0].options.as_slice()[0], "--platform=linux/amd64");
        assert_eq!(
            plan.builds[1].options.as_slice()[0],
            "--platform=linux/arm64/v8"
        );
        assert!(plan.builds[1].options.as_slice().iter().any(|o| o == "-f"));
    }

    #[test]
    fn test_duplicate_platforms_not_deduplicated() {
        let plan = expand("base", &config(&["linux/amd64", "linux/amd64"]));
        assert_eq!(plan.builds.len(), 2);
        assert_eq!(plan.builds[0].tag, plan.builds[1].tag);
    }

    #[test]
    fn test_for_platform() {
        let plan = expand("base", &config(&["linux/amd64", "linux/arm64/v8"]));
        assert_eq!(
            plan.for_platform("linux/arm64/v8").map(|b| b.tag.as_str()),
            Some("proj-base-image-linux/arm64/v8:latest")
        );
        assert!(plan.for_platform("linux/s390x").is_none());
    }
}
