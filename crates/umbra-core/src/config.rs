// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Startup configuration loaded from JSON.
//!
//! Every field has a default, so an empty object (`{}`) is a valid configuration
//! and partial files only override what they name.

use crate::renderer::GraphicsSettings;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Which [`GraphicsBackend`](crate::renderer::GraphicsBackend) to create at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BackendPreference {
    /// The GPU backend when it is compiled in and an adapter exists, else headless.
    #[default]
    Auto,
    /// The in-memory command recorder.
    Headless,
    /// The `wgpu` backend; fails if it is unavailable.
    Wgpu,
}

/// Logger setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
    /// Per-module level overrides.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            modules: BTreeMap::new(),
        }
    }
}

/// The full startup configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rendering settings.
    pub graphics: GraphicsSettings,
    /// Logger setup.
    pub logging: LoggingConfig,
    /// Backend selection.
    pub backend: BackendPreference,
}

impl EngineConfig {
    /// Parses a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse engine configuration")
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config = Self::from_json_str(&json)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        log::info!("EngineConfig: loaded {}", path.display());
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize engine configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::TonemappingMode;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.backend, BackendPreference::Auto);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json_str(
            r#"{
                "graphics": { "gamma": 2.4, "tonemapping": "Reinhard", "culling": { "enabled": false, "frozen": false } },
                "backend": "Headless"
            }"#,
        )
        .unwrap();
        assert_relative_eq!(config.graphics.gamma, 2.4);
        assert_relative_eq!(config.graphics.exposure, 1.0);
        assert_eq!(config.graphics.tonemapping, TonemappingMode::Reinhard);
        assert!(!config.graphics.culling.enabled);
        assert_eq!(config.backend, BackendPreference::Headless);
    }

    #[test]
    fn test_round_trip_through_json() {
        let mut config = EngineConfig::default();
        config.logging.modules.insert("umbra_lanes".into(), "trace".into());
        let json = config.to_json_string().unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = EngineConfig::from_json_str("{ not json").unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(EngineConfig::load("/definitely/not/here.json").is_err());
    }
}
