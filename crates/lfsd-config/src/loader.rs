// Copyright (C) 2026  LFSD Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
use crate::error::{ConfigError, ConfigResult};
use crate::schema::Config;
use crate::validation::Validator;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Configuration loader
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader without validation
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Load configuration from a TOML file
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let path = path.as_ref();
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).await?;
        self.load_from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn load_from_str(&self, content: &str) -> ConfigResult<Config> {
        let config: Config = toml::from_str(content)?;

        if self.validate {
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply `LFSD_*` environment variable overrides
    pub fn apply_env_overrides(&self, config: &mut Config) -> ConfigResult<()> {
        // Store settings
        if let Ok(value) = std::env::var("LFSD_CACHE_DIR") {
            config.store.cache_dir = value;
        }
        if let Ok(value) = std::env::var("LFSD_MAX_CHAIN_DEPTH") {
            config.store.max_chain_depth = value.parse().map_err(|_| {
                ConfigError::env_var_parsing_error(
                    "LFSD_MAX_CHAIN_DEPTH",
                    &value,
                    "expected a positive integer",
                )
            })?;
        }
        if let Ok(value) = std::env::var("LFSD_SERIALIZE_PATHS") {
            config.store.serialize_paths = parse_bool("LFSD_SERIALIZE_PATHS", &value)?;
        }

        // Delta settings
        if let Ok(value) = std::env::var("LFSD_DELTA_BACKEND") {
            config.delta.backend = value.parse().map_err(|reason: String| {
                ConfigError::env_var_parsing_error("LFSD_DELTA_BACKEND", &value, reason)
            })?;
        }
        if let Ok(value) = std::env::var("LFSD_DELTA_PROGRAM") {
            config.delta.program = value;
        }

        // Remote settings
        if let Ok(value) = std::env::var("LFSD_REMOTE_URL") {
            config.remote.url = value;
        }

        // Observability settings
        if let Ok(value) = std::env::var("LFSD_LOG_LEVEL") {
            config.observability.log_level = value;
        }
        if let Ok(value) = std::env::var("LFSD_LOG_FORMAT") {
            config.observability.log_format = value;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse boolean from string (accepts: true, false, yes, no, 1, 0, on, off)
fn parse_bool(variable: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::env_var_parsing_error(
            variable,
            value,
            "expected 'true', 'false', 'yes', 'no', '1', '0', 'on', or 'off'",
        )),
    }
}
