use crate::cli::CliArgs;
use crate::model::NamespaceScope;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_REFRESH_MS: u64 = 3_000;
const MIN_REFRESH_MS: u64 = 500;
const DEFAULT_FORWARD_PORT: u16 = 8080;
const DEFAULT_LOG_TAIL: i64 = 100;
const DEFAULT_DIAGNOSIS_TAIL: i64 = 15;
const DEFAULT_RESTART_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PulseConfigFile {
    #[serde(alias = "refresh")]
    pub refresh_ms: Option<u64>,
    pub forward_local_port: Option<u16>,
    pub log_tail_lines: Option<i64>,
    pub diagnosis_tail_lines: Option<i64>,
    pub restart_threshold: Option<u32>,
    pub namespace: Option<String>,
}

impl PulseConfigFile {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("invalid kube-pulse config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }
}

/// Effective runtime settings: CLI over config file over built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub kubeconfig: Option<PathBuf>,
    pub namespace: NamespaceScope,
    pub refresh: Duration,
    pub forward_local_port: u16,
    pub log_tail_lines: i64,
    pub diagnosis_tail_lines: i64,
    pub restart_threshold: u32,
    pub config_source: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(&CliArgs::default(), PulseConfigFile::default(), None)
    }
}

impl Settings {
    pub fn load(args: &CliArgs) -> Result<Self> {
        let path = args.config.clone().or_else(discover_config_path);
        let file = match &path {
            Some(path) => PulseConfigFile::load(path)?,
            None => PulseConfigFile::default(),
        };
        Ok(Self::resolve(args, file, path))
    }

    pub fn resolve(args: &CliArgs, file: PulseConfigFile, source: Option<PathBuf>) -> Self {
        let refresh_ms = args
            .refresh_ms
            .or(file.refresh_ms)
            .unwrap_or(DEFAULT_REFRESH_MS)
            .max(MIN_REFRESH_MS);
        let namespace = args
            .namespace
            .as_deref()
            .or(file.namespace.as_deref())
            .map(NamespaceScope::from_label)
            .unwrap_or_default();

        Self {
            kubeconfig: args.kubeconfig.clone(),
            namespace,
            refresh: Duration::from_millis(refresh_ms),
            forward_local_port: args
                .forward_port
                .or(file.forward_local_port)
                .unwrap_or(DEFAULT_FORWARD_PORT),
            log_tail_lines: args
                .log_tail
                .or(file.log_tail_lines)
                .unwrap_or(DEFAULT_LOG_TAIL)
                .max(1),
            diagnosis_tail_lines: file
                .diagnosis_tail_lines
                .unwrap_or(DEFAULT_DIAGNOSIS_TAIL)
                .max(1),
            restart_threshold: file.restart_threshold.unwrap_or(DEFAULT_RESTART_THRESHOLD),
            config_source: source,
        }
    }
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KUBE_PULSE_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("kube-pulse.yaml"),
        PathBuf::from("kube-pulse.yml"),
        PathBuf::from(".kube-pulse.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let candidate = PathBuf::from(home).join(".config/kube-pulse/config.yaml");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let settings = Settings::default();
        assert_eq!(settings.refresh, Duration::from_secs(3));
        assert_eq!(settings.forward_local_port, 8080);
        assert_eq!(settings.log_tail_lines, 100);
        assert_eq!(settings.diagnosis_tail_lines, 15);
        assert_eq!(settings.restart_threshold, 5);
        assert_eq!(settings.namespace, NamespaceScope::All);
    }

    #[test]
    fn cli_overrides_file_which_overrides_defaults() {
        let file = PulseConfigFile::parse(
            "refresh_ms: 5000\nforward_local_port: 9000\nnamespace: staging\nrestart_threshold: 10\n",
        )
        .expect("valid config");
        let args = CliArgs {
            forward_port: Some(7000),
            ..CliArgs::default()
        };

        let settings = Settings::resolve(&args, file, None);
        assert_eq!(settings.refresh, Duration::from_secs(5));
        assert_eq!(settings.forward_local_port, 7000);
        assert_eq!(
            settings.namespace,
            NamespaceScope::Named("staging".to_string())
        );
        assert_eq!(settings.restart_threshold, 10);
    }

    #[test]
    fn refresh_interval_is_clamped() {
        let args = CliArgs {
            refresh_ms: Some(10),
            ..CliArgs::default()
        };
        let settings = Settings::resolve(&args, PulseConfigFile::default(), None);
        assert_eq!(settings.refresh, Duration::from_millis(500));
    }

    #[test]
    fn empty_and_unknown_configs() {
        assert_eq!(
            PulseConfigFile::parse("  \n").expect("empty is fine"),
            PulseConfigFile::default()
        );
        assert!(PulseConfigFile::parse("colour: red\n").is_err());
    }
}
