//! Binary presence and minimum-version checks run before generation.
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::cmd::{CmdOptions, CommandRunner};
use crate::discover::subprocess_error;
use crate::error::{Error, Result, Stage, Version};

pub const MIN_TERRAGRUNT_VERSION: Version = Version {
    major: 0,
    minor: 28,
    patch: 1,
};

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"v?(\d+)\.(\d+)\.(\d+)").expect("regex for version banners"))
}

/// Extract the first `X.Y.Z` version from `--version` output.
pub fn parse_version(output: &str) -> Option<Version> {
    let caps = version_regex().captures(output)?;
    let part = |idx: usize| caps.get(idx)?.as_str().parse::<u64>().ok();
    Some(Version {
        major: part(1)?,
        minor: part(2)?,
        patch: part(3)?,
    })
}

pub fn parse_min_version(raw: &str) -> Option<Version> {
    parse_version(raw.trim())
}

pub fn locate_binary(runner: &dyn CommandRunner, binary: &str) -> Result<()> {
    let path = runner.locate(binary).map_err(|reason| Error::BinaryNotFound {
        binary: binary.to_string(),
        reason,
    })?;
    tracing::debug!(path = %path.display(), "resolved {binary}");
    Ok(())
}

/// Fail fast unless `binary` exists and reports a version of at least
/// `minimum`.
pub fn check_binary(
    runner: &dyn CommandRunner,
    binary: &str,
    dir: &Path,
    minimum: Version,
) -> Result<Version> {
    locate_binary(runner, binary)?;

    let opts = CmdOptions::new(binary, dir);
    let out = runner
        .run(&opts, &["--version"])
        .map_err(|err| subprocess_error(err, binary, Stage::Version, dir))?;
    let text = String::from_utf8_lossy(&out);
    let found = parse_version(&text).ok_or_else(|| Error::VersionUnknown {
        binary: binary.to_string(),
        output: text.trim().to_string(),
    })?;
    if found < minimum {
        return Err(Error::Incompatible {
            binary: binary.to_string(),
            found,
            minimum,
        });
    }
    tracing::debug!(%found, %minimum, "{binary} version ok");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::SystemRunner;
    use crate::test_support::ScriptedRunner;

    #[test]
    fn parses_terragrunt_version_banner() {
        assert_eq!(
            parse_version("terragrunt version v0.45.2\n"),
            Some(Version {
                major: 0,
                minor: 45,
                patch: 2
            })
        );
        assert_eq!(parse_version("terragrunt version unknown"), None);
    }

    #[test]
    fn ordering_is_numeric() {
        let old = parse_version("v0.27.9").expect("old");
        let min = parse_version("v0.28.1").expect("min");
        let newer = parse_version("0.100.0").expect("newer");
        assert!(old < MIN_TERRAGRUNT_VERSION);
        assert_eq!(min, MIN_TERRAGRUNT_VERSION);
        assert!(newer > MIN_TERRAGRUNT_VERSION);
    }

    #[test]
    fn missing_binary_is_reported() {
        let err = locate_binary(&SystemRunner, "tgload-no-such-binary-on-path")
            .expect_err("missing");
        assert!(matches!(err, Error::BinaryNotFound { .. }));
    }

    #[test]
    fn banner_without_version_is_unknown() {
        let runner = ScriptedRunner::new(|_, _| Ok(b"terragrunt version dev\n".to_vec()));
        let err = check_binary(&runner, "terragrunt", Path::new("."), MIN_TERRAGRUNT_VERSION)
            .expect_err("unknown");
        match err {
            Error::VersionUnknown { output, .. } => assert_eq!(output, "terragrunt version dev"),
            other => panic!("expected VersionUnknown, got {other:?}"),
        }
    }

    #[test]
    fn minimum_version_is_accepted() {
        let runner = ScriptedRunner::new(|_, _| Ok(b"terragrunt version v0.28.1\n".to_vec()));
        let found = check_binary(&runner, "terragrunt", Path::new("."), MIN_TERRAGRUNT_VERSION)
            .expect("supported");
        assert_eq!(found, MIN_TERRAGRUNT_VERSION);
        assert_eq!(runner.count(&["--version"]), 1);
    }
}
