use anyhow::{bail, Result};
use std::env;
use std::process::Command;

/// Cargo feature sets the test matrix runs, beyond the default build.
pub const FEATURE_MATRIX: &[&str] = &["", "parallel", "rustfft", "parallel rustfft internal-tests"];

/// Demo programs under `demos/` and the features each one needs.
pub const DEMOS: &[(&str, &str)] = &[
    ("basic_usage", ""),
    ("backend_selection", "rustfft"),
    ("verbose_logging", "verbose-logging"),
];

/// Options derived from the host machine used to configure cargo commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub features: Vec<String>,
}

impl BuildConfig {
    /// Join features into a single string suitable for passing to cargo.
    pub fn features_arg(&self) -> Option<String> {
        if self.features.is_empty() {
            None
        } else {
            Some(self.features.join(" "))
        }
    }
}

/// Detect build configuration from the current machine.
pub fn detect_config() -> BuildConfig {
    let nproc = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let extra = env::var("OMNIFFT_FEATURES").unwrap_or_default();
    compute_config(nproc, &extra)
}

/// Compute a [`BuildConfig`] from supplied inputs. This is separated for testing.
pub fn compute_config(nproc: usize, extra: &str) -> BuildConfig {
    let mut features: Vec<String> = Vec::new();
    if nproc > 1 {
        features.push("parallel".into());
    }
    for feat in extra.split_whitespace() {
        if !features.iter().any(|f| f == feat) {
            features.push(feat.to_string());
        }
    }
    BuildConfig { features }
}

fn cargo(args: &[&str], features: Option<&str>) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args(args);
    if let Some(f) = features.filter(|f| !f.is_empty()) {
        cmd.arg("--features").arg(f);
    }
    cmd
}

pub fn build_command(cfg: &BuildConfig) -> Command {
    cargo(&["build"], cfg.features_arg().as_deref())
}

pub fn test_command(cfg: &BuildConfig) -> Command {
    cargo(&["test"], cfg.features_arg().as_deref())
}

pub fn clippy_command() -> Command {
    cargo(&["clippy", "--all-targets", "--all-features"], None)
}

pub fn fmt_command() -> Command {
    cargo(&["fmt", "--all"], None)
}

/// One `cargo test` per entry of [`FEATURE_MATRIX`].
pub fn matrix_commands() -> Vec<Command> {
    FEATURE_MATRIX
        .iter()
        .map(|features| {
            let mut cmd = cargo(&["test", "--no-default-features", "--features"], None);
            let mut set = String::from("std");
            if !features.is_empty() {
                set.push(' ');
                set.push_str(features);
            }
            cmd.arg(set);
            cmd
        })
        .collect()
}

pub fn demo_command(name: &str, features: &str) -> Command {
    cargo(&["run", "--example", name], Some(features))
}

/// Run `commands` in order, stopping at the first failure.
pub fn run_all(commands: impl IntoIterator<Item = Command>) -> Result<()> {
    for mut cmd in commands {
        let status = cmd.status()?;
        if !status.success() {
            bail!("{:?} failed with {status}", cmd);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_parallel_on_multicore_hosts() {
        let cfg = compute_config(8, "rustfft parallel");
        assert_eq!(cfg.features, vec!["parallel", "rustfft"]);
        assert_eq!(cfg.features_arg().as_deref(), Some("parallel rustfft"));

        let single = compute_config(1, "");
        assert!(single.features.is_empty());
        assert_eq!(single.features_arg(), None);
    }

    #[test]
    fn test_commands_include_features() {
        let cfg = compute_config(2, "verbose-logging");
        let build = args(&build_command(&cfg));
        assert_eq!(build, vec!["build", "--features", "parallel verbose-logging"]);
        assert!(args(&test_command(&cfg)).contains(&"test".to_string()));
        assert!(args(&clippy_command()).contains(&"--all-features".to_string()));
        assert!(args(&fmt_command()).contains(&"fmt".to_string()));
    }

    #[test]
    fn test_matrix_always_enables_std() {
        let cmds = matrix_commands();
        assert_eq!(cmds.len(), FEATURE_MATRIX.len());
        assert_eq!(args(&cmds[0]).last().map(String::as_str), Some("std"));
        assert_eq!(args(&cmds[1]).last().map(String::as_str), Some("std parallel"));
    }

    #[test]
    fn test_demo_command() {
        let plain = args(&demo_command("basic_usage", ""));
        assert_eq!(plain, vec!["run", "--example", "basic_usage"]);
        let logged = args(&demo_command("verbose_logging", "verbose-logging"));
        assert!(logged.contains(&"verbose-logging".to_string()));
    }
}
