use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;

/// Validator for configuration settings
pub trait Validator {
    /// Check the value, naming the first offending field on failure
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for Config {
    fn validate(&self) -> ConfigResult<()> {
        self.store.validate()?;
        self.delta.validate()?;
        self.remote.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

impl Validator for StoreConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_chain_depth == 0 {
            return Err(ConfigError::invalid_value(
                "store.max_chain_depth",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Validator for DeltaConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.compression_level > 9 {
            return Err(ConfigError::invalid_value(
                "delta.compression_level",
                format!("must be between 0 and 9, got {}", self.compression_level),
            ));
        }
        if self.backend == DeltaBackend::Xdelta3 && self.program.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "delta.program",
                "must name an executable when backend is xdelta3",
            ));
        }
        Ok(())
    }
}

impl Validator for RemoteConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(url) = self.url() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::invalid_value(
                    "remote.url",
                    format!("must be an http(s) URL, got {}", url),
                ));
            }
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "remote.timeout_secs",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Validator for ObservabilityConfig {
    fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }
        Ok(())
    }
}
