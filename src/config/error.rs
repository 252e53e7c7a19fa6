//! Configuration error types

use std::path::PathBuf;

use snafu::Snafu;

/// Configuration loading and validation errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    #[snafu(display("failed to read config file {}: {source}", path.display()))]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[snafu(display("failed to parse TOML config file {}: {source}", path.display()))]
    ParseToml { path: PathBuf, source: toml::de::Error },

    #[snafu(display("config file {} does not exist", path.display()))]
    MissingFile { path: PathBuf },

    #[snafu(display("invalid value '{value}' for {key}: {reason}"))]
    InvalidEnv { key: String, value: String, reason: String },

    #[snafu(display("configuration validation failed: {message}"))]
    Validation { message: String },
}
