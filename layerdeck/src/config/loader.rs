//! Configuration loading from files and environment variables.

use std::path::Path;

use config::{Config, Environment, File};

use crate::error::{ExtractResult, ExtractionError};

use super::ExtractionConfig;

/// Load configuration from an optional file and `LAYERDECK__*` environment variables.
///
/// Without an explicit path, `layerdeck.toml` (or any format the `config`
/// crate recognizes under that stem) in the working directory is used if present.
pub fn load_config(path: Option<&Path>) -> ExtractResult<ExtractionConfig> {
    let file = match path {
        Some(p) => File::from(p).required(true),
        None => File::with_name("layerdeck").required(false),
    };

    Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("LAYERDECK")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ExtractionError::Config {
            message: format!("Failed to build config: {}", e),
        })?
        .try_deserialize()
        .map_err(|e| ExtractionError::Config {
            message: format!("Failed to deserialize config: {}", e),
        })
}
