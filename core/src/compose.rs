//! Build option composition.

use serde::Serialize;

use crate::config::BuildConfig;

/// Ordered engine arguments for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BuildOptions(Vec<String>);

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, arg: impl Into<String>) {
        self.0.push(arg.into());
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for BuildOptions {
    fn from(args: Vec<String>) -> Self {
        Self(args)
    }
}

impl IntoIterator for BuildOptions {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Extend<String> for BuildOptions {
    fn extend<T: IntoIterator<Item = String>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}

impl std::fmt::Display for BuildOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&render(&self.0))
    }
}

/// Compose the engine flags for a stage.
///
/// Order: build args, `--no-cache`, `--progress`, `-f`, `--target`, `--load`.
pub fn compose(config: &BuildConfig) -> BuildOptions {
    let mut options = BuildOptions::new();
    for (key, value) in &config.build_args {
        options.push("--build-arg");
        options.push(format!("{key}={value}"));
    }
    if config.no_cache {
        options.push("--no-cache");
    }
    if let Some(mode) = &config.progress_mode {
        options.push(format!("--progress={mode}"));
    }
    options.push("-f");
    options.push(config.dockerfile_path.to_string_lossy());
    if let Some(target) = &config.target_stage {
        options.push("--target");
        options.push(target.as_str());
    }
    if config.load {
        options.push("--load");
    }
    options
}

/// Render arguments as a copy-pasteable shell line.
pub(crate) fn render(args: &[String]) -> String {
    shell_words::join(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BuildConfig {
        let mut config = BuildConfig::for_dir("/work/proj/dev-image");
        config.set_build_arg("BASE_IMAGE", "proj-base-image-linux/amd64:latest");
        config.set_build_arg("USER_ID", "1000");
        config.no_cache = true;
        config.progress_mode = Some("plain".to_string());
        config.target_stage = Some("dev".to_string());
        config
    }

    #[test]
    fn test_compose_full_order() {
        let options = compose(&sample());
        assert_eq!(
            options.as_slice(),
            [
                "--build-arg",
                "BASE_IMAGE=proj-base-image-linux/amd64:latest",
                "--build-arg",
                "USER_ID=1000",
                "--no-cache",
                "--progress=plain",
                "-f",
                "/work/proj/dev-image/Dockerfile",
                "--target",
                "dev",
            ]
        );
    }

    #[test]
    fn test_compose_minimal() {
        let config = BuildConfig::for_dir("/work/proj/base-image");
        assert_eq!(
            compose(&config).to_string(),
            "-f /work/proj/base-image/Dockerfile"
        );
    }

    #[test]
    fn test_compose_load_last() {
        let mut config = sample();
        config.load = true;
        assert_eq!(compose(&config).as_slice().last().unwrap(), "--load");
    }

    #[test]
    fn test_compose_stable_across_calls() {
        let config = sample();
        let first = compose(&config);
        for _ in 0..10 {
            assert_eq!(compose(&config), first);
        }
    }

    #[test]
    fn test_render_quotes_spaces() {
        let args = vec![
            "--build-arg".to_string(),
            "MSG=hello world".to_string(),
            "--build-arg".to_string(),
            "QUOTE=it's".to_string(),
        ];
        let rendered = render(&args);
        assert_ne!(rendered, args.join(" "));
        assert_eq!(shell_words::split(&rendered).unwrap(), args);
    }

    #[test]
    fn test_options_serialize_as_list() {
        let options = BuildOptions::from(vec!["-f".to_string(), "Dockerfile".to_string()]);
        assert_eq!(
            serde_json::to_string(&options).unwrap(),
            r#"["-f","Dockerfile"]"#
        );
    }
}
