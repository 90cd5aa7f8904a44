use std::env;

use serde::Deserialize;
use tracing::warn;

pub const AVOID_COPY_AREA_ENV_VAR: &str = "MAPVIEW_AVOID_COPY_AREA";

/// Renderer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Never move old buffer content when the map scrolls; recomposite every
    /// visible square instead. Needed on surfaces where copying is slow or
    /// unreliable.
    pub avoid_copy_area: bool,
}

impl RenderConfig {
    /// Applies `MAPVIEW_AVOID_COPY_AREA` on top of the configured value.
    pub fn with_env_overrides(self) -> Self {
        Self {
            avoid_copy_area: resolve_avoid_copy_area(self.avoid_copy_area),
        }
    }
}

fn resolve_avoid_copy_area(configured: bool) -> bool {
    match env::var(AVOID_COPY_AREA_ENV_VAR) {
        Ok(value) => parse_flag(&value).unwrap_or_else(|| {
            warn!(
                env_var = AVOID_COPY_AREA_ENV_VAR,
                value = value.as_str(),
                "invalid avoid-copy-area env var value; falling back to config"
            );
            configured
        }),
        Err(env::VarError::NotPresent) => configured,
        Err(err) => {
            warn!(
                env_var = AVOID_COPY_AREA_ENV_VAR,
                error = %err,
                "unable to read avoid-copy-area env var; falling back to config"
            );
            configured
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
