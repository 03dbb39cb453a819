//! Reading engine settings from `tidemark.toml` and friends

use super::model::TidemarkConfig;
use crate::error::{TidemarkError, TidemarkResult};
use std::fs;
use std::path::Path;

/// Serialization of a settings file, chosen by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingsFormat {
    Toml,
    Yaml,
    Json,
}

impl SettingsFormat {
    fn of(path: &Path) -> TidemarkResult<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("json") | None => Ok(Self::Json),
            Some(other) => Err(TidemarkError::config_with_context(
                format!("Unsupported settings file extension '.{}'", other),
                format!("Expected .toml, .yaml, .yml or .json for '{}'", path.display()),
            )),
        }
    }

    fn parse(self, content: &str) -> Result<TidemarkConfig, String> {
        match self {
            Self::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Load engine settings from `path`
///
/// A workspace without a settings file runs on the defaults. Keys missing
/// from the file keep their default values.
pub fn load_from_file(path: &Path) -> TidemarkResult<TidemarkConfig> {
    if !path.exists() {
        tracing::debug!("No settings file at {}, using defaults", path.display());
        return Ok(TidemarkConfig::default());
    }

    let format = SettingsFormat::of(path)?;
    let content = fs::read_to_string(path).map_err(|e| {
        TidemarkError::config_with_context(
            format!("Cannot read tidemark settings: {}", e),
            format!("Settings file '{}'", path.display()),
        )
    })?;

    format.parse(&content).map_err(|reason| {
        TidemarkError::config_with_context(
            format!("Invalid tidemark settings ({:?}): {}", format, reason),
            format!("Settings file '{}'", path.display()),
        )
    })
}
