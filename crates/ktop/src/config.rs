//! Configuration loading and validation
//!
//! Precedence, lowest first: built-in defaults, the config file
//! (`~/.config/ktop/config.toml` or `--config`), `KTOP_*` environment
//! variables, command-line flags.

use anyhow::{Context, Result};
use ktop_lib::query::{NodeSortField, PodSortField};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MIN_REFRESH_INTERVAL: Duration = ktop_lib::collector::MIN_INTERVAL;
pub const MAX_REFRESH_INTERVAL: Duration = ktop_lib::collector::MAX_INTERVAL;
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);
pub const MAX_TOP_PODS: i64 = 1000;

/// Validation failures; all are reported before touching the cluster
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid duration for {key}: {value:?}")]
    InvalidDuration { key: &'static str, value: String },

    #[error("refresh interval must be between 500ms and 60s, got {0}")]
    RefreshOutOfRange(String),

    #[error("timeout must be at least 1s, got {0}")]
    TimeoutTooShort(String),

    #[error("top pods must be between 1 and {MAX_TOP_PODS}, got {0}")]
    TopPodsOutOfRange(i64),
}

/// Values as they arrive from file and environment, before validation
#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
    refresh_interval: String,
    timeout: String,
    top_pods: i64,
    all_namespaces: bool,
    sort_nodes: String,
    sort_pods: String,
    metrics_port: Option<u16>,
    log_file: Option<PathBuf>,
}

/// Command-line values; `None` leaves lower layers in charge
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub refresh_interval: Option<Duration>,
    pub timeout: Option<Duration>,
    pub top_pods: Option<i64>,
    pub all_namespaces: bool,
    pub sort_nodes: Option<String>,
    pub sort_pods: Option<String>,
    pub metrics_port: Option<u16>,
    pub log_file: Option<PathBuf>,
}

/// Validated runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub refresh_interval: Duration,
    pub timeout: Duration,
    pub top_pods: usize,
    pub all_namespaces: bool,
    pub node_sort: NodeSortField,
    pub pod_sort: PodSortField,
    pub metrics_port: Option<u16>,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Load every layer; an explicit `config_file` must exist
    pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let (path, required) = match config_file {
            Some(path) => (Some(path.to_path_buf()), true),
            None => (default_config_path(), false),
        };
        Self::load_layers(path.as_deref(), required, None, overrides)
    }

    /// Load with an explicit environment map (`None` reads the process environment)
    fn load_layers(
        file: Option<&Path>,
        file_required: bool,
        env: Option<HashMap<String, String>>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("refresh_interval", "2s")?
            .set_default("timeout", "10s")?
            .set_default("top_pods", 30)?
            .set_default("all_namespaces", false)?
            .set_default("sort_nodes", "cpu")?
            .set_default("sort_pods", "cpu")?;

        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(file_required),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix("KTOP")
                .try_parsing(true)
                .source(env),
        );

        let format = |d: Option<Duration>| d.map(|d| humantime::format_duration(d).to_string());
        builder = builder
            .set_override_option(
                "kubeconfig",
                overrides.kubeconfig.as_ref().map(|p| p.display().to_string()),
            )?
            .set_override_option("context", overrides.context.clone())?
            .set_override_option("refresh_interval", format(overrides.refresh_interval))?
            .set_override_option("timeout", format(overrides.timeout))?
            .set_override_option("top_pods", overrides.top_pods)?
            .set_override_option("all_namespaces", overrides.all_namespaces.then_some(true))?
            .set_override_option("sort_nodes", overrides.sort_nodes.clone())?
            .set_override_option("sort_pods", overrides.sort_pods.clone())?
            .set_override_option("metrics_port", overrides.metrics_port)?
            .set_override_option(
                "log_file",
                overrides.log_file.as_ref().map(|p| p.display().to_string()),
            )?;

        let raw: RawConfig = builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        Ok(raw.validate()?)
    }
}

impl RawConfig {
    fn validate(self) -> Result<Settings, ConfigError> {
        let refresh_interval = parse_duration("refresh_interval", &self.refresh_interval)?;
        if !(MIN_REFRESH_INTERVAL..=MAX_REFRESH_INTERVAL).contains(&refresh_interval) {
            return Err(ConfigError::RefreshOutOfRange(self.refresh_interval));
        }

        let timeout = parse_duration("timeout", &self.timeout)?;
        if timeout < MIN_TIMEOUT {
            return Err(ConfigError::TimeoutTooShort(self.timeout));
        }

        if !(1..=MAX_TOP_PODS).contains(&self.top_pods) {
            return Err(ConfigError::TopPodsOutOfRange(self.top_pods));
        }

        Ok(Settings {
            kubeconfig: self.kubeconfig,
            context: self.context.filter(|c| !c.is_empty()),
            refresh_interval,
            timeout,
            top_pods: self.top_pods as usize,
            all_namespaces: self.all_namespaces,
            node_sort: NodeSortField::parse(&self.sort_nodes),
            pod_sort: PodSortField::parse(&self.sort_pods),
            metrics_port: self.metrics_port,
            log_file: self.log_file,
        })
    }
}

fn parse_duration(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|_| ConfigError::InvalidDuration {
        key,
        value: value.to_string(),
    })
}

/// `~/.config/ktop/config.toml`, if a home directory is known
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".config").join("ktop").join("config.toml"))
}
