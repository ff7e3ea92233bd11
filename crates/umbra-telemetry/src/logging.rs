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

//! `env_logger` setup driven by [`LoggingConfig`].

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::str::FromStr;
use umbra_core::LoggingConfig;

/// Modules whose output is limited to errors.
pub const QUIET_MODULES: [&str; 3] = ["wgpu_hal", "wgpu_core", "naga"];

/// Parses a level name, warning and falling back to `Info` when it is unknown.
pub fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level.trim()).unwrap_or_else(|_| {
        log::warn!("Unknown log level '{level}', using 'info'");
        LevelFilter::Info
    })
}

/// Builds the logger without installing it.
///
/// `RUST_LOG` wins over `config.level`. Per-module overrides from the
/// configuration apply on top.
pub fn build_logger(config: &LoggingConfig) -> Builder {
    let mut builder = Builder::from_env(Env::default().default_filter_or(config.level.as_str()));
    for module in QUIET_MODULES {
        builder.filter_module(module, LevelFilter::Error);
    }
    for (module, level) in &config.modules {
        builder.filter_module(module, parse_level(level));
    }
    builder
}

/// Installs the global logger.
///
/// Calling it again after a logger is installed does nothing, so tests and
/// binaries can both call it.
pub fn init_logging(config: &LoggingConfig) {
    match build_logger(config).try_init() {
        Ok(()) => log::debug!("Logger initialized (default level '{}')", config.level),
        Err(_) => log::trace!("Logger already initialized"),
    }
}
