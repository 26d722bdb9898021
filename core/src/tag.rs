//! Image tag derivation.
//!
//! Turns a `name[:tag]` string plus an optional qualifier (a platform or a
//! build target) into the reference a single build produces:
//!
//! - `myimg` → `myimg:latest`
//! - `myimg:1.0` + `linux/amd64` → `myimg-linux/amd64:1.0`
//! - `myimg` + `dev` → `myimg-dev:latest`
//!
//! Only the first `:` separates name from tag, so registry ports
//! (`localhost:5000/app`) are not supported.

/// Default tag when none is specified.
pub const DEFAULT_TAG: &str = "latest";

/// Split a reference into `(repository, tag)` on the first `:`.
pub fn split(reference: &str) -> (&str, &str) {
    reference
        .split_once(':')
        .unwrap_or((reference, DEFAULT_TAG))
}

/// Derive the final image reference for one build.
pub fn derive(tag: &str, qualifier: Option<&str>) -> String {
    let (repository, tag) = split(tag);
    match qualifier {
        Some(qualifier) => format!("{repository}-{qualifier}:{tag}"),
        None => format!("{repository}:{tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tag_filled_in() {
        assert_eq!(derive("myimg", None), "myimg:latest");
    }

    #[test]
    fn test_explicit_tag_unchanged() {
        assert_eq!(derive("myimg:1.0", None), "myimg:1.0");
    }

    #[test]
    fn test_platform_qualifier_kept_verbatim() {
        assert_eq!(
            derive("myimg:1.0", Some("linux/amd64")),
            "myimg-linux/amd64:1.0"
        );
        assert_eq!(
            derive("proj-base-image", Some("linux/arm64/v8")),
            "proj-base-image-linux/arm64/v8:latest"
        );
    }

    #[test]
    fn test_target_qualifier() {
        assert_eq!(derive("myimg", Some("dev")), "myimg-dev:latest");
    }

    #[test]
    fn test_deterministic() {
        let inputs = [
            ("myimg", None),
            ("myimg:2", Some("dev")),
            ("a/b:c", Some("linux/amd64")),
        ];
        for (tag, qualifier) in inputs {
            assert_eq!(derive(tag, qualifier), derive(tag, qualifier));
        }
    }

    #[test]
    fn test_only_first_colon_splits() {
        assert_eq!(split("host:5000/app:1.0"), ("host", "5000/app:1.0"));
        assert_eq!(
            derive("host:5000/app:1.0", Some("dev")),
            "host-dev:5000/app:1.0"
        );
    }

    #[test]
    fn test_split_without_tag() {
        assert_eq!(split("myimg"), ("myimg", "latest"));
    }
}
