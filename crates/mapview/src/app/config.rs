use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use maprender::RenderConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

pub(crate) const CONFIG_ENV_VAR: &str = "MAPVIEW_CONFIG";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ViewKind {
    #[default]
    Main,
    Mini,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ViewerConfig {
    pub(crate) window_title: String,
    pub(crate) window_width: u32,
    pub(crate) window_height: u32,
    pub(crate) tile_size: i32,
    pub(crate) map_width: i32,
    pub(crate) map_height: i32,
    pub(crate) step_interval_ms: u64,
    pub(crate) view: ViewKind,
    /// Directory with `<name>.png` face images; procedural faces when unset.
    pub(crate) faces_dir: Option<PathBuf>,
    /// Tiles beyond the map edge whose squares stay remembered; `null` keeps all.
    pub(crate) memory_margin: Option<i32>,
    pub(crate) render: RenderConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_title: "Map View".to_string(),
            window_width: 800,
            window_height: 600,
            tile_size: 32,
            map_width: 25,
            map_height: 19,
            step_interval_ms: 250,
            view: ViewKind::Main,
            faces_dir: None,
            memory_margin: Some(32),
            render: RenderConfig::default(),
        }
    }
}

impl ViewerConfig {
    /// Loads the file named by `MAPVIEW_CONFIG`, or the defaults when unset.
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        let config = match env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(env::VarError::NotPresent) => Self::default(),
            Err(err) => {
                warn!(
                    env_var = CONFIG_ENV_VAR,
                    error = %err,
                    "unable to read config env var; using defaults"
                );
                Self::default()
            }
        };
        Ok(Self {
            render: config.render.with_env_overrides(),
            ..config
        })
    }

    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        info!(path = %path.display(), "config_loaded");
        Ok(config)
    }

    fn parse(raw: &str) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(&mut deserializer)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size <= 0 {
            return Err(ConfigError::Invalid {
                field: "tile_size",
                reason: "must be positive",
            });
        }
        if self.map_width <= 0 || self.map_height <= 0 {
            return Err(ConfigError::Invalid {
                field: "map_width/map_height",
                reason: "must be positive",
            });
        }
        if self.memory_margin.is_some_and(|margin| margin < 0) {
            return Err(ConfigError::Invalid {
                field: "memory_margin",
                reason: "must not be negative",
            });
        }
        if self.step_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "step_interval_ms",
                reason: "must be non-zero",
            });
        }
        Ok(())
    }

    pub(crate) fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }
}
