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

//! Backend selection with fallback to the headless recorder.

use super::headless::{HeadlessBackend, DEFAULT_CONSTANT_BUFFER_ALIGNMENT};
use anyhow::Result;
use std::sync::Arc;
use umbra_core::renderer::api::DEFAULT_MAX_FRAMES_IN_FLIGHT;
use umbra_core::renderer::{GraphicsBackend, GraphicsSettings};
use umbra_core::BackendPreference;

/// Creates the backend named by `preference`.
///
/// [`BackendPreference::Auto`] tries the GPU backend first and falls back to
/// [`HeadlessBackend`] when it is not compiled in or no adapter is found.
///
/// ## Errors
/// Fails when [`BackendPreference::Wgpu`] is requested and the GPU backend
/// cannot be created.
pub fn select_backend(
    preference: BackendPreference,
    settings: &GraphicsSettings,
) -> Result<Arc<dyn GraphicsBackend>> {
    log::info!("Selecting graphics backend (preference: {preference:?})...");
    let backend: Arc<dyn GraphicsBackend> = match preference {
        BackendPreference::Headless => Arc::new(headless(settings)),
        BackendPreference::Wgpu => create_wgpu(settings)?,
        BackendPreference::Auto => match create_wgpu(settings) {
            Ok(backend) => backend,
            Err(err) => {
                log::warn!("GPU backend unavailable ({err:#}), falling back to headless.");
                Arc::new(headless(settings))
            }
        },
    };
    log::info!(
        "Selected {} backend with {} frames in flight.",
        backend.backend_type(),
        backend.max_frames_in_flight()
    );
    Ok(backend)
}

fn headless(settings: &GraphicsSettings) -> HeadlessBackend {
    HeadlessBackend::with_config(
        settings
            .max_frames_in_flight
            .unwrap_or(DEFAULT_MAX_FRAMES_IN_FLIGHT),
        DEFAULT_CONSTANT_BUFFER_ALIGNMENT,
    )
}

#[cfg(feature = "wgpu")]
fn create_wgpu(settings: &GraphicsSettings) -> Result<Arc<dyn GraphicsBackend>> {
    Ok(Arc::new(super::wgpu::WgpuBackend::new(settings)?))
}

#[cfg(not(feature = "wgpu"))]
fn create_wgpu(_settings: &GraphicsSettings) -> Result<Arc<dyn GraphicsBackend>> {
    anyhow::bail!("umbra-infra was built without the `wgpu` feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::renderer::BackendType;

    #[test]
    fn test_headless_uses_configured_frames_in_flight() {
        let settings = GraphicsSettings {
            max_frames_in_flight: Some(2),
            ..Default::default()
        };
        let backend = select_backend(BackendPreference::Headless, &settings).unwrap();
        assert_eq!(backend.backend_type(), BackendType::Headless);
        assert_eq!(backend.max_frames_in_flight(), 2);
    }

    #[test]
    fn test_headless_defaults_frames_in_flight() {
        let backend =
            select_backend(BackendPreference::Headless, &GraphicsSettings::default()).unwrap();
        assert_eq!(backend.max_frames_in_flight(), DEFAULT_MAX_FRAMES_IN_FLIGHT);
    }

    #[cfg(not(feature = "wgpu"))]
    #[test]
    fn test_wgpu_without_feature_fails_and_auto_falls_back() {
        let settings = GraphicsSettings::default();
        assert!(select_backend(BackendPreference::Wgpu, &settings).is_err());
        let backend = select_backend(BackendPreference::Auto, &settings).unwrap();
        assert_eq!(backend.backend_type(), BackendType::Headless);
    }
}
