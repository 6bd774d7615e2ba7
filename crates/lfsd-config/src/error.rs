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
//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("IO error reading configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML document did not parse into the schema
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),

    /// Serialization back to TOML failed
    #[error("Failed to serialize configuration: {0}")]
    SerializationError(#[from] toml::ser::Error),

    /// An explicitly requested file is missing
    #[error("Configuration file not found at path: {}", .0.display())]
    FileNotFound(PathBuf),

    /// An `LFSD_*` variable held a value of the wrong shape
    #[error("Environment variable parsing error: {variable_name}={value}. {reason}")]
    EnvVarParsingError {
        /// Name of the offending variable
        variable_name: String,
        /// Raw value as found in the environment
        value: String,
        /// What was expected instead
        reason: String,
    },

    /// A field failed validation
    #[error("Invalid configuration value for field '{field}': {reason}")]
    InvalidValue {
        /// Dotted path of the field, e.g. `delta.compression_level`
        field: String,
        /// Human readable explanation
        reason: String,
    },
}

impl ConfigError {
    /// Build an [`ConfigError::EnvVarParsingError`]
    pub fn env_var_parsing_error(
        variable_name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::EnvVarParsingError {
            variable_name: variable_name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Build an [`ConfigError::InvalidValue`]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
